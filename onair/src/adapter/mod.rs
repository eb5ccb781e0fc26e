//! Platform adapter contract.
//!
//! Every platform integration (Twitch, YouTube, TikTok) satisfies
//! [`PlatformAdapter`]: the lifecycle service hands it an [`EventHandlers`]
//! record on initialize, the adapter translates SDK payloads into
//! [`EventRecord`]s and invokes the handler for the canonical kind, and
//! auxiliary connection telemetry flows through a registered callback.
//! Records are re-validated by the router, so adapters do not have to be
//! trusted with validation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::envelope::{EventKind, EventRecord, Platform};

/// Adapter operation errors.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("adapter initialization failed: {0}")]
    InitializeFailed(String),

    #[error("adapter cleanup failed: {0}")]
    CleanupFailed(String),

    #[error("adapter is not connected")]
    NotConnected,
}

/// Auxiliary telemetry an adapter reports outside the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterTelemetry {
    /// The underlying SDK connection is up.
    Connected,
    /// The underlying SDK connection dropped.
    Disconnected { reason: String },
    /// A non-fatal SDK error worth surfacing.
    Error { message: String },
}

/// Callback invoked with a translated canonical record.
pub type EventCallback = Arc<dyn Fn(EventRecord) + Send + Sync>;

/// Callback invoked with adapter telemetry.
pub type TelemetryCallback = Arc<dyn Fn(AdapterTelemetry) + Send + Sync>;

/// The record of callbacks handed to an adapter on initialize,
/// one per canonical event kind.
#[derive(Clone, Default)]
pub struct EventHandlers {
    handlers: HashMap<EventKind, EventCallback>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one canonical kind (builder style).
    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(EventRecord) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Register one handler for every canonical kind.
    ///
    /// The lifecycle service uses this to funnel all records into the
    /// router's single dispatch path.
    pub fn forward_all<F>(handler: F) -> Self
    where
        F: Fn(EventRecord) + Send + Sync + 'static,
    {
        let handler: EventCallback = Arc::new(handler);
        let mut handlers = HashMap::new();
        for kind in [
            EventKind::Chat,
            EventKind::Follow,
            EventKind::Gift,
            EventKind::Paypiggy,
            EventKind::GiftPaypiggy,
            EventKind::EnvelopeGift,
            EventKind::Raid,
            EventKind::Share,
            EventKind::Cheer,
            EventKind::Redemption,
            EventKind::ViewerCount,
            EventKind::StreamStatus,
        ] {
            handlers.insert(kind, Arc::clone(&handler));
        }
        Self { handlers }
    }

    /// Invoke the handler registered for `kind`, if any.
    ///
    /// Returns true when a handler ran. Unhandled kinds are dropped
    /// silently; the adapter may emit kinds the embedder has not wired.
    pub fn invoke(&self, kind: EventKind, record: EventRecord) -> bool {
        match self.handlers.get(&kind) {
            Some(handler) => {
                handler(record);
                true
            }
            None => {
                tracing::debug!(kind = %kind, "no handler registered; record dropped");
                false
            }
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("kinds", &self.handlers.len())
            .finish()
    }
}

/// Contract every platform integration must satisfy.
///
/// Implementations own their SDK connection. `initialize` must not return
/// until the connection is established (or failed); `cleanup` must release
/// all SDK resources and is expected to complete within the lifecycle
/// service's cleanup timeout.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter integrates.
    fn platform(&self) -> Platform;

    /// Connect and start translating platform payloads into the handlers.
    async fn initialize(&self, handlers: EventHandlers) -> Result<(), AdapterError>;

    /// Disconnect and release resources.
    async fn cleanup(&self) -> Result<(), AdapterError>;

    /// Register a callback for auxiliary connection telemetry.
    fn on_telemetry(&self, callback: TelemetryCallback);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn chat_record() -> EventRecord {
        EventRecord {
            platform: "twitch".to_string(),
            kind: "chat".to_string(),
            id: None,
            timestamp: Some(chrono::Utc::now()),
            username: Some("viewer".to_string()),
            user_id: Some(serde_json::json!("1")),
            data: crate::envelope::RecordData {
                text: Some("hi".to_string()),
                ..Default::default()
            },
            correlation_id: None,
        }
    }

    #[test]
    fn test_per_kind_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let handlers = EventHandlers::new().on(EventKind::Chat, move |record| {
            seen_clone.lock().unwrap().push(record.kind);
        });

        assert!(handlers.invoke(EventKind::Chat, chat_record()));
        assert!(!handlers.invoke(EventKind::Gift, chat_record()));
        assert_eq!(*seen.lock().unwrap(), vec!["chat".to_string()]);
    }

    #[test]
    fn test_forward_all_covers_every_kind() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let handlers = EventHandlers::forward_all(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handlers.len(), 12);

        assert!(handlers.invoke(EventKind::Gift, chat_record()));
        assert!(handlers.invoke(EventKind::StreamStatus, chat_record()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
