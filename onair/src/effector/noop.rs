//! No-op scene control.
//!
//! Used when the overlay is disabled in configuration: the pipeline keeps
//! running, scene calls are accepted and discarded. Also convenient as a
//! stand-in effector in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{ConnectionEvent, SceneControl, SceneError, SceneRequest};

/// Scene control that accepts and discards every call.
pub struct NoopSceneControl {
    events: broadcast::Sender<ConnectionEvent>,
    calls: AtomicU64,
}

impl NoopSceneControl {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(4);
        Self {
            events,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of calls swallowed so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for NoopSceneControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneControl for NoopSceneControl {
    async fn connect(&self) -> Result<(), SceneError> {
        let _ = self.events.send(ConnectionEvent::ConnectionOpened);
        let _ = self.events.send(ConnectionEvent::Identified);
        Ok(())
    }

    async fn disconnect(&self) {}

    async fn call(&self, _request: SceneRequest) -> Result<serde_json::Value, SceneError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(serde_json::Value::Null)
    }

    /// Always ready; the queue never buffers against a disabled overlay.
    fn is_connected(&self) -> bool {
        true
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_swallows_calls() {
        let scene = NoopSceneControl::new();
        assert!(scene.is_connected());

        scene
            .call(SceneRequest::set_input_text("ChatText", "hello"))
            .await
            .unwrap();
        scene.call(SceneRequest::get_scene_list()).await.unwrap();
        assert_eq!(scene.call_count(), 2);
    }
}
