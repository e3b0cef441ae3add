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
//! Topic-keyed pub/sub shared by controllers, the WebSocket client, and
//! external consumers.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, Weak,
    },
};

use futures::future::BoxFuture;

use crate::{
    models::AnyResource,
    websocket::{WebSocketState, WsMessage},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    ResourceAdded,
    ResourceUpdated,
    ResourceDeleted,
    RawResourceEvent,
    ConnectionEvent,
}

/// Message published on the broker.
#[derive(Clone, Debug)]
pub enum BrokerMessage {
    ResourceAdded {
        id: String,
        resource: AnyResource,
    },
    ResourceUpdated {
        id: String,
        resource: AnyResource,
    },
    ResourceDeleted {
        id: String,
        resource: Option<AnyResource>,
    },
    /// A classified WebSocket frame, before any controller has applied it.
    RawResourceEvent {
        message: WsMessage,
    },
    /// WebSocket connection state change.
    Connection {
        state: WebSocketState,
        /// Seconds until the next reconnect attempt, when waiting.
        next_attempt_s: Option<u64>,
    },
}

impl BrokerMessage {
    pub fn topic(&self) -> Topic {
        match self {
            BrokerMessage::ResourceAdded { .. } => Topic::ResourceAdded,
            BrokerMessage::ResourceUpdated { .. } => Topic::ResourceUpdated,
            BrokerMessage::ResourceDeleted { .. } => Topic::ResourceDeleted,
            BrokerMessage::RawResourceEvent { .. } => Topic::RawResourceEvent,
            BrokerMessage::Connection { .. } => Topic::ConnectionEvent,
        }
    }
}

/// A subscriber callback. Sync handlers run inline during publish; async
/// handlers are spawned and tracked so they cannot be dropped mid-flight.
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<dyn Fn(&BrokerMessage) + Send + Sync>),
    Async(Arc<dyn Fn(BrokerMessage) -> BoxFuture<'static, ()> + Send + Sync>),
}

impl Handler {
    pub fn sync(f: impl Fn(&BrokerMessage) + Send + Sync + 'static) -> Handler {
        Handler::Sync(Arc::new(f))
    }

    pub fn asynchronous(
        f: impl Fn(BrokerMessage) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    ) -> Handler {
        Handler::Async(Arc::new(f))
    }
}

#[derive(Default)]
struct BrokerInner {
    subscriptions: Mutex<HashMap<Topic, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

/// Manages subscriptions and distributes messages to subscribers.
#[derive(Clone, Default)]
pub struct EventBroker {
    inner: Arc<BrokerInner>,
}

/// Removes its `(topic, callback)` pairs when invoked. Dropping the handle
/// without calling [`Subscription::unsubscribe`] leaves the subscription in
/// place.
pub struct Subscription {
    broker: Weak<BrokerInner>,
    entries: Vec<(Topic, u64)>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let inner = match self.broker.upgrade() {
            Some(inner) => inner,
            None => return,
        };
        let mut subscriptions = inner.subscriptions.lock().unwrap();
        for (topic, id) in self.entries {
            if let Some(handlers) = subscriptions.get_mut(&topic) {
                handlers.retain(|(handler_id, _)| *handler_id != id);
                if handlers.is_empty() {
                    subscriptions.remove(&topic);
                }
            }
        }
    }
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for one or more topics; the returned handle
    /// removes exactly the registered pairs.
    pub fn subscribe(&self, topics: &[Topic], handler: Handler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscriptions = self.inner.subscriptions.lock().unwrap();
        for topic in topics {
            subscriptions
                .entry(*topic)
                .or_default()
                .push((id, handler.clone()));
        }
        Subscription {
            broker: Arc::downgrade(&self.inner),
            entries: topics.iter().map(|topic| (*topic, id)).collect(),
        }
    }

    /// Publishes a message to all subscribers of its topic.
    ///
    /// The handler list is snapshotted before delivery, so subscribing or
    /// unsubscribing from inside a callback never invalidates the in-flight
    /// iteration. A failing subscriber does not prevent delivery to the
    /// rest.
    pub fn publish(&self, message: BrokerMessage) {
        let handlers: Vec<Handler> = {
            let subscriptions = self.inner.subscriptions.lock().unwrap();
            subscriptions
                .get(&message.topic())
                .map(|handlers| handlers.iter().map(|(_, handler)| handler.clone()).collect())
                .unwrap_or_default()
        };

        tracing::trace!(topic = ?message.topic(), subscribers = handlers.len(), "publishing");

        for handler in handlers {
            match handler {
                Handler::Sync(callback) => {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        callback(&message)
                    }));
                    if result.is_err() {
                        tracing::error!("event subscriber panicked; continuing delivery");
                    }
                }
                Handler::Async(callback) => {
                    let future = callback(message.clone());
                    let handle = tokio::spawn(future);
                    let mut tasks = self.inner.tasks.lock().unwrap();
                    tasks.retain(|task| !task.is_finished());
                    tasks.push(handle);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn connection_message() -> BrokerMessage {
        BrokerMessage::Connection {
            state: WebSocketState::Connected,
            next_attempt_s: None,
        }
    }

    #[tokio::test]
    async fn must_deliver_to_sync_and_async_subscribers() {
        let broker = EventBroker::new();
        let sync_hits = Arc::new(AtomicUsize::new(0));
        let async_hits = Arc::new(AtomicUsize::new(0));

        let hits = sync_hits.clone();
        broker.subscribe(
            &[Topic::ConnectionEvent],
            Handler::sync(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let hits = async_hits.clone();
        broker.subscribe(
            &[Topic::ConnectionEvent],
            Handler::asynchronous(move |_| {
                let hits = hits.clone();
                Box::pin(async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );

        broker.publish(connection_message());
        tokio::task::yield_now().await;

        assert_eq!(sync_hits.load(Ordering::SeqCst), 1);
        assert_eq!(async_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn must_remove_exact_pair_on_unsubscribe() {
        let broker = EventBroker::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let hits = first.clone();
        let subscription = broker.subscribe(
            &[Topic::ConnectionEvent, Topic::ResourceUpdated],
            Handler::sync(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let hits = second.clone();
        broker.subscribe(
            &[Topic::ConnectionEvent],
            Handler::sync(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );

        subscription.unsubscribe();
        broker.publish(connection_message());

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn must_tolerate_unsubscribe_during_publish() {
        let broker = EventBroker::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let broker_clone = broker.clone();
        let subscription = Arc::new(Mutex::new(None::<Subscription>));
        let slot = subscription.clone();
        let counter = hits.clone();
        let handle = broker.subscribe(
            &[Topic::ConnectionEvent],
            Handler::sync(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                // Unsubscribing from inside the callback must not disturb
                // the in-flight delivery.
                if let Some(subscription) = slot.lock().unwrap().take() {
                    subscription.unsubscribe();
                }
                let _ = &broker_clone;
            }),
        );
        *subscription.lock().unwrap() = Some(handle);

        broker.publish(connection_message());
        broker.publish(connection_message());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn must_continue_delivery_past_failing_subscriber() {
        let broker = EventBroker::new();
        let hits = Arc::new(AtomicUsize::new(0));

        broker.subscribe(
            &[Topic::ConnectionEvent],
            Handler::sync(|_| panic!("subscriber bug")),
        );
        let counter = hits.clone();
        broker.subscribe(
            &[Topic::ConnectionEvent],
            Handler::sync(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        broker.publish(connection_message());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
