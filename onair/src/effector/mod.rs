//! Effector adapter contracts.
//!
//! The overlay is driven through a scene-control WebSocket ([`SceneControl`])
//! and speech through [`crate::tts::SpeechProvider`]. The core is agnostic
//! to the scene-control opcode set: requests carry a type string and a JSON
//! payload, and the engine-specific client lives in [`obs`].
//!
//! Readiness contract: `is_connected()` must stay false until the engine
//! has emitted [`ConnectionEvent::Identified`]; the display queue holds
//! calls until then.

pub mod noop;
pub mod obs;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Lifecycle events of the scene-control connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Socket established; the engine is not yet ready for requests.
    ConnectionOpened,
    /// Handshake complete; requests may be issued.
    Identified,
    /// Connection lost; the client will reconnect with backoff.
    ConnectionClosed { reason: String },
}

/// One scene-control request.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRequest {
    /// Engine opcode name, e.g. `SetInputSettings`.
    pub request_type: String,
    pub request_data: serde_json::Value,
}

impl SceneRequest {
    pub fn new(request_type: impl Into<String>, request_data: serde_json::Value) -> Self {
        Self {
            request_type: request_type.into(),
            request_data,
        }
    }

    /// Set the text of an overlay text source.
    pub fn set_input_text(input_name: &str, text: &str) -> Self {
        Self::new(
            "SetInputSettings",
            serde_json::json!({
                "inputName": input_name,
                "inputSettings": { "text": text },
                "overlay": true,
            }),
        )
    }

    /// Show or hide a scene item by name.
    pub fn set_scene_item_enabled(scene_name: &str, item_name: &str, enabled: bool) -> Self {
        Self::new(
            "SetSceneItemEnabled",
            serde_json::json!({
                "sceneName": scene_name,
                "sceneItemName": item_name,
                "sceneItemEnabled": enabled,
            }),
        )
    }

    /// List available scenes.
    pub fn get_scene_list() -> Self {
        Self::new("GetSceneList", serde_json::json!({}))
    }
}

/// Scene-control failures.
#[derive(Debug, Clone, Error)]
pub enum SceneError {
    /// The engine has not identified yet (or the connection dropped).
    #[error("not connected")]
    NotConnected,

    #[error("scene call failed: {0}")]
    CallFailed(String),

    #[error("scene call timed out")]
    Timeout,
}

/// Scene-control engine contract.
#[async_trait]
pub trait SceneControl: Send + Sync {
    /// Start the connection (and its reconnect loop).
    async fn connect(&self) -> Result<(), SceneError>;

    /// Close the connection and stop reconnecting.
    async fn disconnect(&self);

    /// Issue a request; fails with [`SceneError::NotConnected`] before
    /// the engine has identified.
    async fn call(&self, request: SceneRequest) -> Result<serde_json::Value, SceneError>;

    /// True only between `Identified` and the next `ConnectionClosed`.
    fn is_connected(&self) -> bool;

    /// Subscribe to connection lifecycle events.
    fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent>;
}
