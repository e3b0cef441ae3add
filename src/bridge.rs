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
//! The bridge: owns the HTTP session, the broker, every controller, and the
//! WebSocket client, and wires them together.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, Weak,
};

use url::Url;

use crate::{
    auth::{AuthController, LoginOutcome, OtpType},
    controllers::{
        DeviceContext, GarageDoorController, GateController, LightController, LockController,
        PartitionController, SensorController, SystemController, ThermostatController,
        TroubleConditionController, WaterSensorController, WaterValveController,
    },
    error::Result,
    events::{BrokerMessage, EventBroker, Handler, Subscription, Topic},
    http::{Credentials, HttpSession, URL_BASE},
    websocket::{WebSocketClient, WebSocketState},
};

/// Connection options for [`AlarmBridge`].
#[derive(Clone, Debug)]
pub struct BridgeOpts {
    pub username: String,
    pub password: String,
    /// Device-trust cookie from an earlier `submit_otp` with a device name.
    pub mfa_cookie: Option<String>,
    pub base_url: Url,
}

impl BridgeOpts {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            mfa_cookie: None,
            base_url: URL_BASE.parse().expect("default base URL is valid"),
        }
    }

    pub fn mfa_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.mfa_cookie = Some(cookie.into());
        self
    }

    pub fn base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }
}

struct BridgeInner {
    session: HttpSession,
    broker: EventBroker,
    auth: Arc<AuthController>,
    systems: SystemController,
    partitions: PartitionController,
    sensors: SensorController,
    lights: LightController,
    locks: LockController,
    garage_doors: GarageDoorController,
    gates: GateController,
    thermostats: ThermostatController,
    water_valves: WaterValveController,
    water_sensors: WaterSensorController,
    trouble_conditions: TroubleConditionController,
    websocket: WebSocketClient,
    initialized: AtomicBool,
    reconnect_subscription: Mutex<Option<Subscription>>,
}

/// Presents the provider as a live, observable set of typed devices.
#[derive(Clone)]
pub struct AlarmBridge {
    inner: Arc<BridgeInner>,
}

impl AlarmBridge {
    pub fn new(opts: BridgeOpts) -> Result<Self> {
        let session = HttpSession::new(
            opts.base_url,
            Credentials {
                username: opts.username,
                password: opts.password,
            },
            opts.mfa_cookie,
        )?;
        let broker = EventBroker::new();
        let context = Arc::new(DeviceContext::default());
        let auth = Arc::new(AuthController::new(
            session.clone(),
            broker.clone(),
            context.clone(),
        ));
        let websocket = WebSocketClient::new(session.clone(), auth.clone(), broker.clone());

        macro_rules! controller {
            () => {
                crate::controllers::DeviceController::new(
                    session.clone(),
                    broker.clone(),
                    context.clone(),
                )
            };
        }

        Ok(Self {
            inner: Arc::new(BridgeInner {
                systems: controller!(),
                partitions: controller!(),
                sensors: controller!(),
                lights: controller!(),
                locks: controller!(),
                garage_doors: controller!(),
                gates: controller!(),
                thermostats: controller!(),
                water_valves: controller!(),
                water_sensors: controller!(),
                trouble_conditions: controller!(),
                session,
                broker,
                auth,
                websocket,
                initialized: AtomicBool::new(false),
                reconnect_subscription: Mutex::new(None),
            }),
        })
    }

    /// Logs in, loads the full device state, and starts the WebSocket
    /// pipeline.
    ///
    /// When the login is gated on a one-time password the gate outcome is
    /// returned and nothing else is started; finish the flow with
    /// [`AlarmBridge::request_otp`] / [`AlarmBridge::submit_otp`] and call
    /// `initialize` again.
    pub async fn initialize(&self) -> Result<LoginOutcome> {
        match self.inner.auth.login().await? {
            LoginOutcome::Success => {}
            gate => return Ok(gate),
        }

        self.fetch_full_state().await?;
        self.inner.initialized.store(true, Ordering::SeqCst);

        self.inner.websocket.initialize()?;
        self.subscribe_reconnect();

        Ok(LoginOutcome::Success)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Refreshes every controller from the API. On first use this also
    /// subscribes the controllers to WebSocket events.
    pub async fn fetch_full_state(&self) -> Result<()> {
        async fn start<K: crate::controllers::DeviceKind>(
            controller: &crate::controllers::DeviceController<K>,
        ) -> Result<()> {
            if controller.is_initialized() {
                controller.refresh().await
            } else {
                controller.initialize().await
            }
        }

        let inner = &self.inner;
        futures::try_join!(
            start(&inner.systems),
            start(&inner.partitions),
            start(&inner.sensors),
            start(&inner.lights),
            start(&inner.locks),
            start(&inner.garage_doors),
            start(&inner.gates),
            start(&inner.thermostats),
            start(&inner.water_valves),
            start(&inner.water_sensors),
            start(&inner.trouble_conditions),
        )?;
        Ok(())
    }

    /// Re-fetches the full state whenever the WebSocket announces a
    /// reconnect, so that events missed during the outage are not lost.
    fn subscribe_reconnect(&self) {
        let mut slot = self.inner.reconnect_subscription.lock().unwrap();
        if slot.is_some() {
            return;
        }

        let weak: Weak<BridgeInner> = Arc::downgrade(&self.inner);
        let subscription = self.inner.broker.subscribe(
            &[Topic::ConnectionEvent],
            Handler::asynchronous(move |message| {
                let weak = weak.clone();
                Box::pin(async move {
                    let reconnected = matches!(
                        message,
                        BrokerMessage::Connection {
                            state: WebSocketState::Reconnected,
                            ..
                        }
                    );
                    if !reconnected {
                        return;
                    }
                    if let Some(inner) = weak.upgrade() {
                        let bridge = AlarmBridge { inner };
                        if let Err(err) = bridge.fetch_full_state().await {
                            tracing::warn!("full-state refresh after reconnect failed: {}", err);
                        }
                    }
                })
            }),
        );
        *slot = Some(subscription);
    }

    /// Stops the WebSocket pipeline. The HTTP session stays usable.
    pub async fn stop(&self) {
        self.inner.websocket.stop();
    }

    //
    // Login gates
    //

    pub async fn request_otp(&self, method: OtpType) -> Result<()> {
        self.inner.auth.request_otp(method).await
    }

    /// Verifies an OTP; with a device name the device is trusted and the
    /// returned cookie can be passed to [`BridgeOpts::mfa_cookie`] next
    /// time.
    pub async fn submit_otp(
        &self,
        code: &str,
        method: OtpType,
        device_name: Option<&str>,
    ) -> Result<Option<String>> {
        self.inner.auth.submit_otp(code, method, device_name).await
    }

    //
    // Accessors
    //

    pub fn events(&self) -> &EventBroker {
        &self.inner.broker
    }

    /// Subscribes to bridge events; see [`Topic`] for what is published.
    pub fn subscribe(&self, topics: &[Topic], handler: Handler) -> Subscription {
        self.inner.broker.subscribe(topics, handler)
    }

    pub fn auth(&self) -> &AuthController {
        &self.inner.auth
    }

    pub fn websocket_state(&self) -> WebSocketState {
        self.inner.websocket.state()
    }

    /// The most recent raw WebSocket frames, for diagnostics.
    pub fn last_ws_events(&self) -> Vec<String> {
        self.inner.websocket.last_events()
    }

    pub fn systems(&self) -> &SystemController {
        &self.inner.systems
    }

    pub fn partitions(&self) -> &PartitionController {
        &self.inner.partitions
    }

    pub fn sensors(&self) -> &SensorController {
        &self.inner.sensors
    }

    pub fn lights(&self) -> &LightController {
        &self.inner.lights
    }

    pub fn locks(&self) -> &LockController {
        &self.inner.locks
    }

    pub fn garage_doors(&self) -> &GarageDoorController {
        &self.inner.garage_doors
    }

    pub fn gates(&self) -> &GateController {
        &self.inner.gates
    }

    pub fn thermostats(&self) -> &ThermostatController {
        &self.inner.thermostats
    }

    pub fn water_valves(&self) -> &WaterValveController {
        &self.inner.water_valves
    }

    pub fn water_sensors(&self) -> &WaterSensorController {
        &self.inner.water_sensors
    }

    pub fn trouble_conditions(&self) -> &TroubleConditionController {
        &self.inner.trouble_conditions
    }

    /// The underlying HTTP session, for callers that need raw API access.
    pub fn session(&self) -> &HttpSession {
        &self.inner.session
    }
}

impl std::fmt::Debug for AlarmBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmBridge")
            .field("session", &self.inner.session)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
