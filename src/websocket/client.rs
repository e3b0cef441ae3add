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
//! Persistent WebSocket client.
//!
//! Three background tasks cooperate: the reader keeps the connection up
//! (reconnecting with jittered backoff), the processor classifies frames
//! from the reader's queue and republishes them on the broker, and the
//! keep-alive task pings the provider and periodically reloads the session
//! context. If any task dies with an error the client goes DEAD and the
//! siblings are cancelled.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use futures::StreamExt;
use rand::Rng;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::{
    auth::AuthController,
    error::{Error, Result},
    events::{BrokerMessage, EventBroker},
    http::{HttpSession, KEEP_ALIVE_DEFAULT_PATH},
    websocket::messages::{classify, Classification},
};

pub const MAX_CONNECTION_ATTEMPTS: u32 = 25;
const MAX_RECONNECT_WAIT_S: u64 = 30 * 60;
const KEEP_ALIVE_SIGNAL_INTERVAL: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// A reconnect is only announced after the link has stayed up this long.
const RECONNECT_EMIT_DELAY: Duration = Duration::from_secs(5);
const EVENT_HISTORY_CAPACITY: usize = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebSocketState {
    Connected,
    Disconnected,
    Connecting,
    Waiting,
    Dead,
    /// Emitted (never stored) when a connection comes back and survives the
    /// announcement delay.
    Reconnected,
}

/// Jittered reconnect backoff; never exceeds [`MAX_RECONNECT_WAIT_S`].
fn bounded_wait(attempts: u32, jitter: f64) -> u64 {
    (10.0 * attempts as f64 * jitter).min(MAX_RECONNECT_WAIT_S as f64).round() as u64
}

struct WsAuth {
    token: String,
    endpoint: String,
}

struct WsInner {
    session: HttpSession,
    auth: Arc<AuthController>,
    broker: EventBroker,
    state: Mutex<WebSocketState>,
    ws_auth: Mutex<Option<WsAuth>>,
    history: Mutex<VecDeque<String>>,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    initialized: AtomicBool,
}

/// Controls the WebSocket connection and feeds classified messages into the
/// broker.
#[derive(Clone)]
pub struct WebSocketClient {
    inner: Arc<WsInner>,
}

impl WebSocketClient {
    pub fn new(session: HttpSession, auth: Arc<AuthController>, broker: EventBroker) -> Self {
        Self {
            inner: Arc::new(WsInner {
                session,
                auth,
                broker,
                state: Mutex::new(WebSocketState::Disconnected),
                ws_auth: Mutex::new(None),
                history: Mutex::new(VecDeque::with_capacity(EVENT_HISTORY_CAPACITY)),
                tasks: Mutex::new(Vec::new()),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> WebSocketState {
        *self.inner.state.lock().unwrap()
    }

    pub fn connected(&self) -> bool {
        self.state() == WebSocketState::Connected
    }

    /// The most recent raw frames (bounded history), oldest first.
    pub fn last_events(&self) -> Vec<String> {
        self.inner.history.lock().unwrap().iter().cloned().collect()
    }

    /// Starts the reader, processor, and keep-alive tasks. The connection is
    /// re-established automatically if it drops.
    pub fn initialize(&self) -> Result<()> {
        if self.inner.auth.identity_id().is_none() {
            return Err(Error::NotInitialized);
        }
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<String>();

        let reader = self.inner.clone();
        WsInner::spawn_supervised(&self.inner, "reader", async move {
            WsInner::event_reader(reader, frame_tx).await
        });

        let processor = self.inner.clone();
        WsInner::spawn_supervised(&self.inner, "processor", async move {
            WsInner::event_processor(processor, frame_rx).await
        });

        let keep_alive = self.inner.clone();
        WsInner::spawn_supervised(&self.inner, "keep-alive", async move {
            WsInner::keep_alive(keep_alive).await
        });

        Ok(())
    }

    /// Stops all background tasks and marks the client disconnected.
    pub fn stop(&self) {
        self.inner.stop_with(WebSocketState::Disconnected);
    }
}

impl WsInner {
    fn spawn_supervised<F>(inner: &Arc<WsInner>, name: &'static str, future: F)
    where
        F: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let weak = Arc::downgrade(inner);
        let handle = tokio::spawn(async move {
            if let Err(err) = future.await {
                tracing::error!("WebSocket {} task failed: {}; killing siblings", name, err);
                if let Some(inner) = weak.upgrade() {
                    inner.stop_with(WebSocketState::Dead);
                }
            }
        });
        let mut tasks = inner.tasks.lock().unwrap();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    fn stop_with(self: &Arc<Self>, state: WebSocketState) {
        self.set_state(state, None);
        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        for task in tasks {
            task.abort();
        }
        self.initialized.store(false, Ordering::SeqCst);
    }

    /// Stores the new state and publishes a connection event when it
    /// changed. RECONNECTED is stored as CONNECTED and announced only after
    /// [`RECONNECT_EMIT_DELAY`], and only if the connection is still up.
    fn set_state(self: &Arc<Self>, state: WebSocketState, next_attempt_s: Option<u64>) {
        let effective = if state == WebSocketState::Reconnected {
            WebSocketState::Connected
        } else {
            state
        };

        {
            let mut current = self.state.lock().unwrap();
            if *current == state {
                return;
            }
            *current = effective;
        }

        if state == WebSocketState::Reconnected {
            let inner = self.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(RECONNECT_EMIT_DELAY).await;
                if *inner.state.lock().unwrap() == WebSocketState::Connected {
                    inner.broker.publish(BrokerMessage::Connection {
                        state: WebSocketState::Reconnected,
                        next_attempt_s: None,
                    });
                } else {
                    tracing::debug!("connection dropped again; skipping reconnect announcement");
                }
            });
            let mut tasks = self.tasks.lock().unwrap();
            tasks.retain(|task| !task.is_finished());
            tasks.push(handle);
        } else {
            self.broker.publish(BrokerMessage::Connection {
                state,
                next_attempt_s,
            });
        }
    }

    /// Fetches a fresh WebSocket token and endpoint through the mini
    /// envelope.
    async fn authenticate(&self) -> Result<()> {
        tracing::debug!("fetching WebSocket token");
        *self.ws_auth.lock().unwrap() = None;

        let envelope = self
            .session
            .get_mini(self.session.api_url("websockets/token"))
            .await?;
        let endpoint = envelope
            .meta_str("endpoint")
            .ok_or_else(|| Error::unexpected("no WebSocket endpoint in token response"))?
            .to_owned();
        let token = envelope
            .value_str()
            .ok_or_else(|| Error::unexpected("no WebSocket token in token response"))?
            .to_owned();

        *self.ws_auth.lock().unwrap() = Some(WsAuth { token, endpoint });
        Ok(())
    }

    fn connect_url(&self) -> Option<String> {
        let auth = self.ws_auth.lock().unwrap();
        auth.as_ref()
            .map(|auth| format!("{}/?f=1&auth={}", auth.endpoint, auth.token))
    }

    /// Maintains the connection and pushes raw text frames into the
    /// processor queue. Only returns with an error, which kills the client.
    async fn event_reader(
        inner: Arc<WsInner>,
        frames: mpsc::UnboundedSender<String>,
    ) -> Result<()> {
        inner.set_state(WebSocketState::Connecting, None);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            match inner.connect_once(&frames, attempts == 1).await {
                Ok(()) => {
                    // The connection was established and later dropped.
                    attempts = 1;
                }
                Err(err) => {
                    tracing::debug!("WebSocket connect failed: {}", err);
                }
            }

            if attempts >= MAX_CONNECTION_ATTEMPTS {
                return Err(Error::unavailable(format!(
                    "giving up after {} failed connection attempts",
                    attempts
                )));
            }

            let wait = bounded_wait(attempts, rand::thread_rng().gen_range(0.0..1.0));
            tracing::debug!(
                "WebSocket disconnected; reconnect attempt {} of {} in {} seconds",
                attempts,
                MAX_CONNECTION_ATTEMPTS,
                wait
            );
            if attempts % 10 == 0 {
                tracing::warn!("{} attempts to reconnect the WebSocket have failed", attempts);
            }

            inner.set_state(WebSocketState::Disconnected, Some(wait));
            inner.set_state(WebSocketState::Waiting, None);
            tokio::time::sleep(Duration::from_secs(wait)).await;
        }
    }

    /// One authenticate-connect-read cycle. `Ok` means the connection was
    /// up and then closed; `Err` means it never came up.
    async fn connect_once(
        self: &Arc<Self>,
        frames: &mpsc::UnboundedSender<String>,
        first_attempt: bool,
    ) -> Result<()> {
        self.authenticate().await?;
        let url = self
            .connect_url()
            .ok_or_else(|| Error::unexpected("no WebSocket credentials"))?;

        tracing::info!("connecting to the Alarm.com WebSocket endpoint");
        let (mut stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| Error::unavailable("WebSocket connect timed out"))?
            .map_err(|err| Error::unavailable(format!("WebSocket connect failed: {}", err)))?;

        self.set_state(
            if first_attempt {
                WebSocketState::Connected
            } else {
                WebSocketState::Reconnected
            },
            None,
        );
        tracing::info!("connected to WebSocket");

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    {
                        let mut history = self.history.lock().unwrap();
                        if history.len() == EVENT_HISTORY_CAPACITY {
                            history.pop_front();
                        }
                        history.push_back(text.clone());
                    }
                    if frames.send(text).is_err() {
                        return Err(Error::unavailable("frame queue closed"));
                    }
                }
                Ok(Message::Close(close)) => {
                    // Close code 1008 means a rejected token; the provider's
                    // web app reconnects immediately in that case too.
                    tracing::info!("WebSocket closed by server: {:?}", close);
                }
                Ok(other) => {
                    tracing::debug!("discarding non-text WebSocket message: {:?}", other);
                }
                Err(err) => {
                    tracing::info!("WebSocket read error: {}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Drains the frame queue, classifies each frame, and republishes the
    /// actionable ones. Classification failures never kill the pipeline.
    async fn event_processor(
        inner: Arc<WsInner>,
        mut frames: mpsc::UnboundedReceiver<String>,
    ) -> Result<()> {
        while let Some(raw) = frames.recv().await {
            match classify(&raw) {
                Ok(Classification::Message(message)) => {
                    tracing::debug!("classified WebSocket message for {}", message.device_id());
                    inner
                        .broker
                        .publish(BrokerMessage::RawResourceEvent { message });
                }
                Ok(Classification::Ignored(kind)) => {
                    tracing::trace!("ignoring {:?} frame", kind);
                }
                Ok(Classification::Unsupported) => {
                    tracing::warn!("unprocessable WebSocket message: {}", raw);
                }
                Err(err) => {
                    tracing::warn!("failed to classify WebSocket message: {}", err);
                }
            }
        }
        Ok(())
    }

    /// Sends a keep-alive every minute while connected; every
    /// `ceil(session_refresh_interval / 60s)` signals the session context is
    /// reloaded and the WebSocket token renewed.
    async fn keep_alive(inner: Arc<WsInner>) -> Result<()> {
        let refresh_interval_ms = inner.auth.session_refresh_interval_ms();
        let signals_per_refresh =
            ((refresh_interval_ms + 59_999) / 60_000).max(1);
        tracing::info!(
            "session refresh every {} ms ({} keep-alive signals)",
            refresh_interval_ms,
            signals_per_refresh
        );

        let mut signals_sent: u64 = 0;
        loop {
            tokio::time::sleep(KEEP_ALIVE_SIGNAL_INTERVAL).await;

            if *inner.state.lock().unwrap() != WebSocketState::Connected {
                tracing::debug!("not connected; skipping keep-alive");
                signals_sent = 0;
                continue;
            }

            if let Err(err) = inner.send_keep_alive().await {
                // Connection-level recovery is the reader's job.
                tracing::debug!("keep-alive failed: {}", err);
            }
            signals_sent += 1;

            if signals_sent >= signals_per_refresh {
                signals_sent = 0;
                if let Err(err) = inner.reload_session_context().await {
                    tracing::debug!("session context reload failed: {}", err);
                }
            }
        }
    }

    async fn send_keep_alive(&self) -> Result<()> {
        if !self.auth.enable_keep_alive() {
            return Ok(());
        }

        let path = self
            .auth
            .keep_alive_url()
            .unwrap_or_else(|| format!("/{}", KEEP_ALIVE_DEFAULT_PATH));
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let url = self
            .session
            .base_url()
            .join(&format!("{}?timestamp={}", path.trim_start_matches('/'), timestamp))
            .map_err(|err| Error::unexpected(format!("bad keep-alive URL: {}", err)))?;

        let final_url = self.session.get_html(url).await?;
        if final_url.path().to_ascii_lowercase().contains("login") {
            return Err(Error::SessionExpired);
        }
        Ok(())
    }

    /// POSTs the context reload and renews the WebSocket token afterwards.
    async fn reload_session_context(&self) -> Result<()> {
        let profile_id = self.auth.profile_id().ok_or(Error::NotInitialized)?;
        tracing::info!("reloading session context");

        let url = self
            .session
            .api_url(&format!("identities/{}/reloadContext", profile_id));
        self.session
            .post_raw(url, json!({"included": [], "meta": {"transformer_version": "1.1"}}))
            .await?;

        self.authenticate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_bound_reconnect_wait() {
        for attempts in 1..=MAX_CONNECTION_ATTEMPTS {
            for jitter in [0.0, 0.37, 0.99999] {
                assert!(bounded_wait(attempts, jitter) <= MAX_RECONNECT_WAIT_S);
            }
        }
        // Large attempt counts saturate at the cap.
        assert_eq!(bounded_wait(10_000, 0.9), MAX_RECONNECT_WAIT_S);
        assert_eq!(bounded_wait(3, 0.5), 15);
    }
}
