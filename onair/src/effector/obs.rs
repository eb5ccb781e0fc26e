//! OBS-style scene-control WebSocket client.
//!
//! Speaks the v5-style JSON protocol: `Hello` (op 0) → `Identify` (op 1) →
//! `Identified` (op 2), then `Request` (op 6) / `RequestResponse` (op 7).
//! The client owns its reconnect loop: on close it reports
//! [`ConnectionEvent::ConnectionClosed`], clears the identified flag and
//! retries with the same jittered backoff schedule the platform lifecycle
//! uses. Password-authenticated engines are not supported; an auth
//! challenge in `Hello` is reported and the session abandoned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ConnectionEvent, SceneControl, SceneError, SceneRequest};
use crate::lifecycle::{Backoff, BackoffConfig};

/// Capacity of the connection-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Scene-control client configuration.
#[derive(Debug, Clone)]
pub struct ObsConfig {
    /// WebSocket address, e.g. `ws://127.0.0.1:4455`.
    pub address: String,
    /// Timeout for connecting and for individual calls.
    pub connection_timeout: Duration,
    /// Reconnect schedule.
    pub backoff: BackoffConfig,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            address: crate::config::DEFAULT_OBS_ADDRESS.to_string(),
            connection_timeout: Duration::from_millis(
                crate::config::DEFAULT_OBS_CONNECTION_TIMEOUT_MS,
            ),
            backoff: BackoffConfig::default(),
        }
    }
}

struct PendingCall {
    request_id: String,
    request: SceneRequest,
    respond: oneshot::Sender<Result<serde_json::Value, SceneError>>,
}

struct ObsInner {
    config: ObsConfig,
    events: broadcast::Sender<ConnectionEvent>,
    identified: AtomicBool,
    request_tx: Mutex<Option<mpsc::UnboundedSender<PendingCall>>>,
    shutdown: Mutex<Option<CancellationToken>>,
    next_request_id: AtomicU64,
}

/// OBS-style scene-control client.
#[derive(Clone)]
pub struct ObsSceneControl {
    inner: Arc<ObsInner>,
}

impl ObsSceneControl {
    pub fn new(config: ObsConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ObsInner {
                config,
                events,
                identified: AtomicBool::new(false),
                request_tx: Mutex::new(None),
                shutdown: Mutex::new(None),
                next_request_id: AtomicU64::new(1),
            }),
        }
    }

    async fn run_loop(
        inner: Arc<ObsInner>,
        mut request_rx: mpsc::UnboundedReceiver<PendingCall>,
        shutdown: CancellationToken,
    ) {
        let mut backoff = Backoff::new(inner.config.backoff.clone());

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            // Requests queued while disconnected are refused, not held.
            while let Ok(call) = request_rx.try_recv() {
                let _ = call.respond.send(Err(SceneError::NotConnected));
            }

            let connected = tokio::time::timeout(
                inner.config.connection_timeout,
                tokio_tungstenite::connect_async(&inner.config.address),
            )
            .await;

            match connected {
                Ok(Ok((ws, _response))) => {
                    backoff.reset();
                    let _ = inner.events.send(ConnectionEvent::ConnectionOpened);

                    let reason =
                        Self::session(&inner, ws, &mut request_rx, &shutdown).await;

                    inner.identified.store(false, Ordering::SeqCst);
                    let _ = inner.events.send(ConnectionEvent::ConnectionClosed {
                        reason: reason.clone(),
                    });
                    if shutdown.is_cancelled() {
                        break;
                    }
                    warn!(reason = %reason, "scene-control session ended; reconnecting");
                }
                Ok(Err(error)) => {
                    warn!(%error, address = %inner.config.address, "scene-control connect failed");
                }
                Err(_) => {
                    warn!(address = %inner.config.address, "scene-control connect timed out");
                }
            }

            let delay = backoff.next_delay();
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("scene-control client stopped");
    }

    /// One connected session: handshake, then request/response pumping.
    ///
    /// Returns the close reason.
    async fn session(
        inner: &Arc<ObsInner>,
        mut ws: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        request_rx: &mut mpsc::UnboundedReceiver<PendingCall>,
        shutdown: &CancellationToken,
    ) -> String {
        // Handshake: Hello → Identify → Identified.
        match Self::read_message(&mut ws).await {
            Some(hello) if hello["op"] == 0 => {
                if !hello["d"]["authentication"].is_null() {
                    warn!("scene-control engine requires authentication; not supported");
                    return "authentication required".to_string();
                }
            }
            Some(other) => {
                return format!("expected Hello, got op {}", other["op"]);
            }
            None => return "closed before Hello".to_string(),
        }

        let identify = serde_json::json!({ "op": 1, "d": { "rpcVersion": 1 } });
        if ws
            .send(Message::Text(identify.to_string().into()))
            .await
            .is_err()
        {
            return "failed to send Identify".to_string();
        }

        match Self::read_message(&mut ws).await {
            Some(message) if message["op"] == 2 => {
                inner.identified.store(true, Ordering::SeqCst);
                let _ = inner.events.send(ConnectionEvent::Identified);
                info!(address = %inner.config.address, "scene-control identified");
            }
            Some(other) => return format!("expected Identified, got op {}", other["op"]),
            None => return "closed before Identified".to_string(),
        }

        let mut pending: HashMap<String, oneshot::Sender<Result<serde_json::Value, SceneError>>> =
            HashMap::new();

        let reason = loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = ws.close(None).await;
                    break "shutdown".to_string();
                }

                call = request_rx.recv() => {
                    let Some(call) = call else {
                        break "request channel closed".to_string();
                    };
                    let frame = serde_json::json!({
                        "op": 6,
                        "d": {
                            "requestType": call.request.request_type,
                            "requestId": call.request_id,
                            "requestData": call.request.request_data,
                        }
                    });
                    if ws.send(Message::Text(frame.to_string().into())).await.is_err() {
                        let _ = call.respond.send(Err(SceneError::NotConnected));
                        break "send failed".to_string();
                    }
                    pending.insert(call.request_id, call.respond);
                }

                message = ws.next() => {
                    let Some(message) = message else {
                        break "socket ended".to_string();
                    };
                    let message = match message {
                        Ok(m) => m,
                        Err(error) => break format!("read error: {error}"),
                    };

                    match message {
                        Message::Text(text) => {
                            let Ok(value) = serde_json::from_str::<serde_json::Value>(&text)
                            else {
                                continue;
                            };
                            if value["op"] == 7 {
                                Self::resolve_response(&mut pending, &value);
                            }
                        }
                        Message::Ping(payload) => {
                            let _ = ws.send(Message::Pong(payload)).await;
                        }
                        Message::Close(frame) => {
                            break format!("closed: {frame:?}");
                        }
                        _ => {}
                    }
                }
            }
        };

        // Calls that never got a response fail as disconnected.
        for (_, respond) in pending.drain() {
            let _ = respond.send(Err(SceneError::NotConnected));
        }

        reason
    }

    fn resolve_response(
        pending: &mut HashMap<String, oneshot::Sender<Result<serde_json::Value, SceneError>>>,
        value: &serde_json::Value,
    ) {
        let Some(request_id) = value["d"]["requestId"].as_str() else {
            return;
        };
        let Some(respond) = pending.remove(request_id) else {
            return;
        };

        let status = &value["d"]["requestStatus"];
        if status["result"].as_bool().unwrap_or(false) {
            let _ = respond.send(Ok(value["d"]["responseData"].clone()));
        } else {
            let comment = status["comment"].as_str().unwrap_or("request rejected");
            let _ = respond.send(Err(SceneError::CallFailed(comment.to_string())));
        }
    }

    async fn read_message(
        ws: &mut tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    ) -> Option<serde_json::Value> {
        loop {
            let message = ws.next().await?.ok()?;
            match message {
                Message::Text(text) => return serde_json::from_str(&text).ok(),
                Message::Ping(payload) => {
                    let _ = ws.send(Message::Pong(payload)).await;
                }
                Message::Close(_) => return None,
                _ => {}
            }
        }
    }
}

#[async_trait]
impl SceneControl for ObsSceneControl {
    async fn connect(&self) -> Result<(), SceneError> {
        let mut shutdown_slot = self.inner.shutdown.lock().expect("obs lock poisoned");
        if shutdown_slot.is_some() {
            // Already running.
            return Ok(());
        }

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        *self.inner.request_tx.lock().expect("obs lock poisoned") = Some(request_tx);

        let token = CancellationToken::new();
        *shutdown_slot = Some(token.clone());
        drop(shutdown_slot);

        tokio::spawn(Self::run_loop(
            Arc::clone(&self.inner),
            request_rx,
            token,
        ));
        Ok(())
    }

    async fn disconnect(&self) {
        self.inner.identified.store(false, Ordering::SeqCst);
        if let Some(token) = self.inner.shutdown.lock().expect("obs lock poisoned").take() {
            token.cancel();
        }
        *self.inner.request_tx.lock().expect("obs lock poisoned") = None;
    }

    async fn call(&self, request: SceneRequest) -> Result<serde_json::Value, SceneError> {
        if !self.is_connected() {
            return Err(SceneError::NotConnected);
        }

        let tx = {
            let guard = self.inner.request_tx.lock().expect("obs lock poisoned");
            guard.clone().ok_or(SceneError::NotConnected)?
        };

        let request_id = format!(
            "req-{}",
            self.inner.next_request_id.fetch_add(1, Ordering::SeqCst)
        );
        let (respond, response) = oneshot::channel();

        tx.send(PendingCall {
            request_id,
            request,
            respond,
        })
        .map_err(|_| SceneError::NotConnected)?;

        match tokio::time::timeout(self.inner.config.connection_timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SceneError::NotConnected),
            Err(_) => Err(SceneError::Timeout),
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.identified.load(Ordering::SeqCst)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }
}
