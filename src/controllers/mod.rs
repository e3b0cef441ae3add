/*
 * Copyright 2021 the alarmdotcom_sdk developers
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
//! Per-resource-type controllers.
//!
//! A controller owns every resource of one wire type: it fetches them from
//! the JSON:API endpoints, applies WebSocket mutations, publishes
//! added/updated/deleted events on the broker, and exposes the command
//! surface for its kind.

mod garage_doors;
mod gates;
mod lights;
mod locks;
mod partitions;
mod sensors;
mod systems;
mod thermostats;
mod trouble_conditions;
mod users;
mod water_sensors;
mod water_valves;

pub use garage_doors::GarageDoorController;
pub use gates::GateController;
pub use lights::LightController;
pub use locks::LockController;
pub use partitions::PartitionController;
pub use sensors::SensorController;
pub use systems::SystemController;
pub use thermostats::ThermostatController;
pub use trouble_conditions::TroubleConditionController;
pub use users::{DealerController, IdentityController, ProfileController};
pub use water_sensors::WaterSensorController;
pub use water_valves::WaterValveController;

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, RwLock, Weak,
    },
};

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use crate::{
    error::{Error, Result},
    events::{BrokerMessage, EventBroker, Handler, Subscription, Topic},
    http::HttpSession,
    jsonapi::Resource,
    models::{ResourceKind, ResourceType, TypedResource},
    websocket::{
        messages::{ResourceEventType, ResourcePropertyChangeType},
        WsMessage,
    },
};

/// WebSocket notifications a controller wants to receive.
#[derive(Clone, Copy, Debug, Default)]
pub struct SupportedResourceEvents {
    pub events: &'static [ResourceEventType],
    pub property_changes: &'static [ResourcePropertyChangeType],
}

impl SupportedResourceEvents {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.property_changes.is_empty()
    }
}

/// Session-scoped facts device handlers need (currently the identity's
/// temperature-unit preference).
#[derive(Debug, Default)]
pub struct DeviceContext {
    use_celsius: AtomicBool,
}

impl DeviceContext {
    pub fn use_celsius(&self) -> bool {
        self.use_celsius.load(Ordering::Relaxed)
    }

    pub fn set_use_celsius(&self, value: bool) {
        self.use_celsius.store(value, Ordering::Relaxed);
    }
}

/// Static description of one controller kind: endpoint, supported WebSocket
/// notifications, and the event-to-mutation rules.
pub trait DeviceKind: ResourceKind {
    /// Multi-device endpoint path under `web/api/`; `None` for kinds that
    /// are only ever fed by a parent controller.
    const ENDPOINT: Option<&'static str>;

    /// Extra query string for the multi-device fetch.
    const QUERY: Option<&'static str> = None;

    /// Restricts the controller to explicitly targeted ids (single-serve
    /// endpoints).
    const REQUIRES_TARGET_IDS: bool = false;

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents::default()
    }

    /// Declarative event-to-state mapping, applied to both `state` and
    /// `desiredState` before [`DeviceKind::apply_event`] runs.
    fn event_state(_event: ResourceEventType) -> Option<i64> {
        None
    }

    /// Kind-specific attribute mutations for a WebSocket message.
    fn apply_event(_attributes: &mut Map<String, Value>, _message: &WsMessage, _ctx: &DeviceContext) {
    }
}

type ChildCallback = Arc<dyn Fn(Vec<Resource>) -> BoxFuture<'static, ()> + Send + Sync>;

struct ControllerInner<K: DeviceKind> {
    session: HttpSession,
    broker: EventBroker,
    context: Arc<DeviceContext>,
    resources: RwLock<HashMap<String, TypedResource<K>>>,
    /// Included resources from the last fetch, kept so that children
    /// subscribing after the fetch still receive them.
    included: Mutex<Vec<Resource>>,
    target_ids: Mutex<HashSet<String>>,
    child_receivers: Mutex<HashMap<ResourceType, Vec<(u64, ChildCallback)>>>,
    next_receiver_id: AtomicU64,
    initialized: AtomicBool,
    /// Set when this controller is fed by a parent instead of fetching.
    provider_driven: AtomicBool,
    ws_subscription: Mutex<Option<Subscription>>,
}

/// Generic registry of typed resources keyed by id.
pub struct DeviceController<K: DeviceKind> {
    inner: Arc<ControllerInner<K>>,
}

impl<K: DeviceKind> Clone for DeviceController<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: DeviceKind> DeviceController<K> {
    pub fn new(session: HttpSession, broker: EventBroker, context: Arc<DeviceContext>) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                session,
                broker,
                context,
                resources: RwLock::new(HashMap::new()),
                included: Mutex::new(Vec::new()),
                target_ids: Mutex::new(HashSet::new()),
                child_receivers: Mutex::new(HashMap::new()),
                next_receiver_id: AtomicU64::new(0),
                initialized: AtomicBool::new(false),
                provider_driven: AtomicBool::new(false),
                ws_subscription: Mutex::new(None),
            }),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        K::TYPE
    }

    //
    // Registry access
    //

    pub fn items(&self) -> Vec<TypedResource<K>> {
        self.inner.resources.read().unwrap().values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.inner.resources.read().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<TypedResource<K>> {
        self.inner.resources.read().unwrap().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.resources.read().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.resources.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.resources.read().unwrap().is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    //
    // Initialization
    //

    /// Fetches the controller's resources and subscribes it to WebSocket
    /// events. Safe to call twice; the second call is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.subscribe_ws();
        self.refresh().await
    }

    /// Initializes this controller as a dependent of `provider`: it will not
    /// fetch on its own, but is driven by the provider's `included` lists.
    ///
    /// The subscription callback only holds a weak reference back to this
    /// controller, so the provider never keeps it alive.
    pub async fn initialize_with_provider<P: DeviceKind>(
        &self,
        provider: &DeviceController<P>,
    ) -> Result<()> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.provider_driven.store(true, Ordering::SeqCst);
        self.subscribe_ws();

        let weak: Weak<ControllerInner<K>> = Arc::downgrade(&self.inner);
        let callback: ChildCallback = Arc::new(move |resources| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    let controller = DeviceController { inner };
                    if let Err(err) = controller.apply_universe(resources).await {
                        tracing::warn!("[{}] provider-driven refresh failed: {}", K::TYPE, err);
                    }
                }
            })
        });
        // The unsubscribe closure is intentionally dropped: the subscription
        // lives as long as the bridge that owns both controllers.
        let _unsubscribe = provider.subscribe_child(&[K::TYPE], callback).await;
        Ok(())
    }

    /// Adds a target id (single-serve kinds) and fetches it.
    pub async fn add_target(&self, id: &str) -> Result<Option<TypedResource<K>>> {
        self.inner.target_ids.lock().unwrap().insert(id.to_owned());
        self.refresh_resource(id).await?;
        Ok(self.get(id))
    }

    fn subscribe_ws(&self) {
        let supported = K::supported_events();
        if supported.is_empty() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.broker.subscribe(
            &[Topic::RawResourceEvent],
            Handler::sync(move |message| {
                if let BrokerMessage::RawResourceEvent { message } = message {
                    if let Some(inner) = weak.upgrade() {
                        let controller = DeviceController { inner };
                        controller.handle_ws(message);
                    }
                }
            }),
        );
        *self.inner.ws_subscription.lock().unwrap() = Some(subscription);
    }

    //
    // Refresh
    //

    /// Full refresh from the kind's endpoint. The response defines the
    /// universe: known ids missing from it are unregistered.
    pub async fn refresh(&self) -> Result<()> {
        if self.inner.provider_driven.load(Ordering::SeqCst) {
            // Dependent controllers are refreshed by their data provider.
            return Ok(());
        }
        self.refresh_inner(None).await
    }

    /// Refreshes a single resource; only the targeted id is unregistered if
    /// its GET comes back without it.
    pub async fn refresh_resource(&self, id: &str) -> Result<()> {
        self.refresh_inner(Some(id)).await
    }

    /// Applies a pre-fetched resource list as the complete universe. Used by
    /// data providers to drive dependent controllers.
    pub async fn apply_universe(&self, resources: Vec<Resource>) -> Result<()> {
        self.apply(resources, None).await
    }

    async fn refresh_inner(&self, resource_id: Option<&str>) -> Result<()> {
        tracing::debug!("[{}] refreshing controller", K::TYPE);

        let endpoint = match K::ENDPOINT {
            Some(endpoint) => endpoint,
            None => return Ok(()),
        };

        let mut urls = Vec::new();
        if let Some(id) = resource_id {
            urls.push(self.inner.session.api_url(&format!("{}/{}", endpoint, id)));
        } else if K::REQUIRES_TARGET_IDS {
            let targets = self.inner.target_ids.lock().unwrap().clone();
            if targets.is_empty() {
                return Ok(());
            }
            for id in targets {
                urls.push(self.inner.session.api_url(&format!("{}/{}", endpoint, id)));
            }
        } else {
            let path = match K::QUERY {
                Some(query) => format!("{}?{}", endpoint, query),
                None => endpoint.to_owned(),
            };
            urls.push(self.inner.session.api_url(&path));
        }

        let mut resources = Vec::new();
        for url in urls {
            let document = self.inner.session.get(url).await?;

            // Refresh the included cache: replace on a full fetch, extend on
            // a single-resource fetch.
            {
                let mut included = self.inner.included.lock().unwrap();
                if resource_id.is_some() {
                    included.extend(document.included.iter().cloned());
                } else {
                    *included = document.included.clone();
                }
            }
            self.dispatch_included(&document.included).await;

            resources.extend(document.data.into_vec());
        }

        self.apply(resources, resource_id).await
    }

    /// Registers/updates the given resources and unregisters what the fetch
    /// universe no longer contains.
    async fn apply(&self, resources: Vec<Resource>, resource_id: Option<&str>) -> Result<()> {
        let mut discovered: HashSet<String> = HashSet::new();
        for resource in resources {
            if resource.kind != K::TYPE.as_str() {
                continue;
            }
            if let Some(id) = self.register_or_update(resource) {
                discovered.insert(id);
            }
        }

        match resource_id {
            Some(id) => {
                if !discovered.contains(id) {
                    self.unregister(id);
                }
            }
            None => {
                let missing: Vec<String> = {
                    let resources = self.inner.resources.read().unwrap();
                    resources
                        .keys()
                        .filter(|id| !discovered.contains(*id))
                        .cloned()
                        .collect()
                };
                for id in missing {
                    self.unregister(&id);
                }
            }
        }

        Ok(())
    }

    /// Hands the included resources to each subscribed child controller,
    /// split by type, before this controller emits its own events.
    async fn dispatch_included(&self, included: &[Resource]) {
        if included.is_empty() {
            return;
        }
        let receivers = self.inner.child_receivers.lock().unwrap().clone();
        for (resource_type, callbacks) in receivers {
            let of_type: Vec<Resource> = included
                .iter()
                .filter(|resource| ResourceType::from_wire(&resource.kind) == resource_type)
                .cloned()
                .collect();
            if of_type.is_empty() {
                continue;
            }
            for (_, callback) in &callbacks {
                callback(of_type.clone()).await;
            }
        }
    }

    /// Registers a controller that depends on this one for API data.
    /// Returns an unsubscribe closure. If this controller has already
    /// fetched, the cached included resources are replayed immediately.
    pub async fn subscribe_child(
        &self,
        types: &[ResourceType],
        callback: ChildCallback,
    ) -> impl FnOnce() + Send {
        let id = self.inner.next_receiver_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut receivers = self.inner.child_receivers.lock().unwrap();
            for resource_type in types {
                receivers
                    .entry(*resource_type)
                    .or_default()
                    .push((id, callback.clone()));
            }
        }

        // Replay for children that subscribe after the fetch.
        let cached = self.inner.included.lock().unwrap().clone();
        if !cached.is_empty() {
            for resource_type in types {
                let of_type: Vec<Resource> = cached
                    .iter()
                    .filter(|resource| ResourceType::from_wire(&resource.kind) == *resource_type)
                    .cloned()
                    .collect();
                if !of_type.is_empty() {
                    callback(of_type).await;
                }
            }
        }

        let inner = Arc::downgrade(&self.inner);
        let types: Vec<ResourceType> = types.to_vec();
        move || {
            if let Some(inner) = inner.upgrade() {
                let mut receivers = inner.child_receivers.lock().unwrap();
                for resource_type in types {
                    if let Some(callbacks) = receivers.get_mut(&resource_type) {
                        callbacks.retain(|(callback_id, _)| *callback_id != id);
                    }
                }
            }
        }
    }

    //
    // Registry mutation
    //

    /// Decodes and stores a resource. No event fires when the decoded
    /// attributes are unchanged; otherwise an added or updated event is
    /// published. Returns the id on success, `None` when decoding failed
    /// (the resource is skipped, never the whole batch).
    fn register_or_update(&self, resource: Resource) -> Option<String> {
        let typed = match TypedResource::<K>::from_resource(resource) {
            Ok(typed) => typed,
            Err(err) => {
                tracing::warn!("[{}] skipping undecodable resource: {}", K::TYPE, err);
                return None;
            }
        };
        let id = typed.id().to_owned();

        let previous = {
            let mut resources = self.inner.resources.write().unwrap();
            let previous = resources.get(&id).cloned();
            if let Some(previous) = &previous {
                if previous.attributes() == typed.attributes() {
                    return Some(id);
                }
            }
            resources.insert(id.clone(), typed.clone());
            previous
        };

        if previous.is_some() {
            tracing::debug!("[{}] updated {} {}", K::TYPE, id, typed.name());
            self.inner.broker.publish(BrokerMessage::ResourceUpdated {
                id: id.clone(),
                resource: typed.into_any(),
            });
        } else {
            tracing::debug!("[{}] registered {} {}", K::TYPE, id, typed.name());
            self.inner.broker.publish(BrokerMessage::ResourceAdded {
                id: id.clone(),
                resource: typed.into_any(),
            });
        }

        Some(id)
    }

    fn unregister(&self, id: &str) {
        let removed = self.inner.resources.write().unwrap().remove(id);
        if removed.is_some() {
            tracing::debug!("[{}] unregistered {}", K::TYPE, id);
        }
        self.inner.broker.publish(BrokerMessage::ResourceDeleted {
            id: id.to_owned(),
            resource: removed.map(TypedResource::into_any),
        });
    }

    //
    // WebSocket ingestion
    //

    /// Applies a classified WebSocket message to the registry: first the
    /// declarative state map, then the kind's own mutations, then a normal
    /// register-or-update pass (which decides whether an event fires).
    fn handle_ws(&self, message: &WsMessage) {
        let supported = K::supported_events();
        let wanted = match message {
            WsMessage::Event(event) => supported.events.contains(&event.subtype),
            WsMessage::PropertyChange(change) => {
                supported.property_changes.contains(&change.subtype)
            }
        };
        if !wanted {
            return;
        }

        let existing = match self.get(message.device_id()) {
            Some(existing) => existing,
            None => {
                tracing::warn!(
                    "[{}] state change for unknown device {}",
                    K::TYPE,
                    message.device_id()
                );
                return;
            }
        };

        let mut raw = existing.raw().clone();

        if let WsMessage::Event(event) = message {
            if let Some(state) = K::event_state(event.subtype) {
                raw.attributes.insert("state".to_owned(), json!(state));
                raw.attributes.insert("desiredState".to_owned(), json!(state));
            }
        }

        K::apply_event(&mut raw.attributes, message, &self.inner.context);

        self.register_or_update(raw);
    }

    //
    // Commands
    //

    /// POSTs `<endpoint>/<id>/<command>` with `statePollOnly: false` plus
    /// the given body. The id must be registered.
    pub(crate) async fn send_command(
        &self,
        id: &str,
        command: &str,
        body: Map<String, Value>,
    ) -> Result<()> {
        let endpoint = K::ENDPOINT.ok_or_else(|| {
            Error::unsupported(format!("{} resources do not accept commands", K::TYPE))
        })?;
        if !self.contains(id) {
            return Err(Error::UnknownDevice { id: id.to_owned() });
        }

        let mut merged = Map::new();
        merged.insert("statePollOnly".to_owned(), json!(false));
        merged.extend(body);

        let url = self
            .inner
            .session
            .api_url(&format!("{}/{}/{}", endpoint, id, command));
        self.inner.session.post(url, Value::Object(merged)).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::{LockKind, LockState, StatefulDevice};
    use std::sync::atomic::AtomicUsize;

    fn lock_attributes(state: i64) -> Value {
        json!({
            "description": "Front Door",
            "state": state,
            "desiredState": state,
            "hasPermissionToChangeState": true,
            "remoteCommandsEnabled": true,
        })
    }

    fn counter_for(broker: &EventBroker, topic: Topic) -> Arc<AtomicUsize> {
        let counter = Arc::new(AtomicUsize::new(0));
        let hits = counter.clone();
        broker.subscribe(
            &[topic],
            Handler::sync(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        counter
    }

    #[tokio::test]
    async fn must_mirror_the_refresh_universe() {
        let (controller, broker) = offline_controller::<LockKind>();
        let added = counter_for(&broker, Topic::ResourceAdded);
        let deleted = counter_for(&broker, Topic::ResourceDeleted);

        controller
            .apply_universe(vec![
                resource("1-1", ResourceType::Lock, lock_attributes(1)),
                resource("1-2", ResourceType::Lock, lock_attributes(2)),
            ])
            .await
            .unwrap();
        assert_eq!(controller.len(), 2);
        assert_eq!(added.load(Ordering::SeqCst), 2);

        // The next universe drops 1-2: it must be unregistered.
        controller
            .apply_universe(vec![resource("1-1", ResourceType::Lock, lock_attributes(1))])
            .await
            .unwrap();
        assert_eq!(controller.ids(), vec!["1-1".to_owned()]);
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn must_not_emit_events_for_unchanged_attributes() {
        let (controller, broker) = offline_controller::<LockKind>();
        let updated = counter_for(&broker, Topic::ResourceUpdated);

        let universe = vec![resource("1-1", ResourceType::Lock, lock_attributes(1))];
        controller.apply_universe(universe.clone()).await.unwrap();
        controller.apply_universe(universe).await.unwrap();
        assert_eq!(updated.load(Ordering::SeqCst), 0);

        controller
            .apply_universe(vec![resource("1-1", ResourceType::Lock, lock_attributes(2))])
            .await
            .unwrap();
        assert_eq!(updated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn must_keep_registry_ids_unique() {
        let (controller, _broker) = offline_controller::<LockKind>();
        for _ in 0..3 {
            controller
                .apply_universe(vec![
                    resource("1-1", ResourceType::Lock, lock_attributes(1)),
                    resource("1-1", ResourceType::Lock, lock_attributes(2)),
                ])
                .await
                .unwrap();
        }
        assert_eq!(controller.len(), 1);
    }

    #[tokio::test]
    async fn must_skip_undecodable_resources_without_aborting() {
        let (controller, _broker) = offline_controller::<LockKind>();
        controller
            .apply_universe(vec![
                resource("1-1", ResourceType::Lock, json!({"description": "broken"})),
                resource("1-2", ResourceType::Lock, lock_attributes(1)),
            ])
            .await
            .unwrap();
        assert_eq!(controller.ids(), vec!["1-2".to_owned()]);
    }

    #[tokio::test]
    async fn must_ignore_resources_of_other_types() {
        let (controller, _broker) = offline_controller::<LockKind>();
        controller
            .apply_universe(vec![resource(
                "1-9",
                ResourceType::Light,
                lock_attributes(1),
            )])
            .await
            .unwrap();
        assert!(controller.is_empty());
    }

    #[tokio::test]
    async fn must_apply_event_state_map_idempotently() {
        let (controller, broker) = offline_controller::<LockKind>();
        let updated = counter_for(&broker, Topic::ResourceUpdated);

        controller
            .apply_universe(vec![resource("1-5", ResourceType::Lock, lock_attributes(2))])
            .await
            .unwrap();

        let message = WsMessage::Event(crate::websocket::EventMessage {
            device_id: "1-5".into(),
            subtype: ResourceEventType::DoorLocked,
            value: Some(0.0),
            subvalue: String::new(),
            date_utc: None,
        });

        controller.handle_ws(&message);
        let lock = controller.get("1-5").unwrap();
        assert_eq!(lock.attributes().state(), LockState::Locked);
        assert_eq!(lock.attributes().desired_state(), Some(LockState::Locked));
        assert_eq!(updated.load(Ordering::SeqCst), 1);

        // Re-delivering the same frame must not produce a second update.
        controller.handle_ws(&message);
        assert_eq!(updated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn must_dispatch_included_to_child_controllers() {
        let (parent, _broker) = offline_controller::<LockKind>();
        let received = Arc::new(Mutex::new(Vec::<String>::new()));

        let sink = received.clone();
        let _unsubscribe = parent
            .subscribe_child(
                &[ResourceType::Sensor],
                Arc::new(move |resources| {
                    let sink = sink.clone();
                    Box::pin(async move {
                        sink.lock()
                            .unwrap()
                            .extend(resources.into_iter().map(|r| r.id));
                    })
                }),
            )
            .await;

        parent
            .dispatch_included(&[
                resource("1-2", ResourceType::Sensor, json!({})),
                resource("1-3", ResourceType::Sensor, json!({})),
                resource("9", ResourceType::System, json!({})),
            ])
            .await;

        assert_eq!(*received.lock().unwrap(), vec!["1-2", "1-3"]);
    }

    #[tokio::test]
    async fn must_replay_cached_includes_to_late_subscribers() {
        let (parent, _broker) = offline_controller::<LockKind>();
        *parent.inner.included.lock().unwrap() =
            vec![resource("1-2", ResourceType::Sensor, json!({}))];

        let received = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = received.clone();
        let _unsubscribe = parent
            .subscribe_child(
                &[ResourceType::Sensor],
                Arc::new(move |resources| {
                    let sink = sink.clone();
                    Box::pin(async move {
                        sink.lock()
                            .unwrap()
                            .extend(resources.into_iter().map(|r| r.id));
                    })
                }),
            )
            .await;

        assert_eq!(*received.lock().unwrap(), vec!["1-2"]);
    }

    #[tokio::test]
    async fn must_reject_commands_for_unknown_ids() {
        let (controller, _broker) = offline_controller::<LockKind>();
        let err = controller
            .send_command("1-404", "lock", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownDevice { .. }));
    }
}
