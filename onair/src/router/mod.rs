//! Platform event router.
//!
//! The single dispatch path from adapter records to the notification
//! manager. Every record is re-validated, checked against the feature
//! gates, and then either handled directly (chat, stream telemetry) or
//! admitted through the suppression store. The router owns the store;
//! nothing else mutates it.

mod gates;

pub use gates::gate_allows;

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::bus::{platform_event_topic, BusMessage, EventBus};
use crate::config::Settings;
use crate::envelope::{EventEnvelope, EventKind, EventRecord, Platform, ValidationError};
use crate::notify::{NotificationManager, NotifyOutcome};
use crate::suppression::{Admission, SuppressionStore};

/// Routing failure; validation problems pass through unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What happened to a routed record.
#[derive(Debug, PartialEq)]
pub enum RouteOutcome {
    /// Forwarded to the notification manager.
    Notified(NotifyOutcome),
    /// Dropped silently by a feature gate.
    GateDisabled,
    /// Dropped by the dedup index.
    Duplicate,
    /// Dropped by the per-user rate limit.
    Suppressed,
    /// Folded into an open combo group.
    Accumulated,
    /// Lightweight kind consumed by a runtime handler.
    Handled,
}

/// Callback for viewer-count updates.
pub type ViewerCountHandler = Arc<dyn Fn(Platform, u64) + Send + Sync>;

/// Callback for live/offline transitions.
pub type StreamStatusHandler = Arc<dyn Fn(Platform, bool) + Send + Sync>;

/// Routes validated events through gates and the suppression store.
pub struct EventRouter {
    settings: Arc<Settings>,
    store: SuppressionStore,
    manager: Arc<NotificationManager>,
    bus: EventBus,
    viewer_count_handler: Option<ViewerCountHandler>,
    stream_status_handler: Option<StreamStatusHandler>,
}

impl EventRouter {
    pub fn new(
        settings: Arc<Settings>,
        store: SuppressionStore,
        manager: Arc<NotificationManager>,
        bus: EventBus,
    ) -> Self {
        Self {
            settings,
            store,
            manager,
            bus,
            viewer_count_handler: None,
            stream_status_handler: None,
        }
    }

    /// Install the lightweight viewer-count handler.
    pub fn on_viewer_count(&mut self, handler: ViewerCountHandler) {
        self.viewer_count_handler = Some(handler);
    }

    /// Install the lightweight stream-status handler.
    pub fn on_stream_status(&mut self, handler: StreamStatusHandler) {
        self.stream_status_handler = Some(handler);
    }

    /// Route one record.
    ///
    /// Validation failures are returned to the caller, who decides whether
    /// to log or propagate; they never panic and never reach the bus.
    pub fn route_record(
        &mut self,
        record: &EventRecord,
        now: Instant,
    ) -> Result<RouteOutcome, RouteError> {
        let envelope = EventEnvelope::try_from_record(record)?;
        Ok(self.route_envelope(envelope, now))
    }

    /// Route an already-validated envelope.
    pub fn route_envelope(&mut self, envelope: EventEnvelope, now: Instant) -> RouteOutcome {
        let platform_settings = self.settings.platform(envelope.platform);

        if !gates::gate_allows(&self.settings.general, platform_settings, envelope.kind) {
            debug!(
                platform = %envelope.platform,
                kind = %envelope.kind,
                "feature gate disabled; event dropped"
            );
            return RouteOutcome::GateDisabled;
        }

        // Observers (overlay state, audit subscribers) see every gated-in,
        // validated envelope.
        self.bus.emit(
            &platform_event_topic(envelope.platform),
            BusMessage::Event(envelope.clone()),
        );

        match envelope.kind {
            EventKind::Chat => {
                RouteOutcome::Notified(self.manager.handle_chat(&envelope))
            }
            EventKind::ViewerCount => {
                if let crate::envelope::EventData::ViewerCount { count } = envelope.data {
                    if let Some(handler) = &self.viewer_count_handler {
                        handler(envelope.platform, count);
                    }
                }
                RouteOutcome::Handled
            }
            EventKind::StreamStatus => {
                if let crate::envelope::EventData::StreamStatus { live } = envelope.data {
                    if let Some(handler) = &self.stream_status_handler {
                        handler(envelope.platform, live);
                    }
                }
                RouteOutcome::Handled
            }
            _ => match self.store.admit(envelope, now) {
                Admission::Forward(envelope) => {
                    RouteOutcome::Notified(self.manager.handle_event(&envelope))
                }
                Admission::Accumulated => RouteOutcome::Accumulated,
                Admission::Duplicate => RouteOutcome::Duplicate,
                Admission::Suppressed => RouteOutcome::Suppressed,
            },
        }
    }

    /// Settle idle combo groups and forward the aggregates.
    ///
    /// Called periodically by the runtime's dispatch loop.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let settled = self.store.sweep(now);
        let count = settled.len();
        for envelope in settled {
            self.manager.handle_event(&envelope);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayConfig, DisplayQueue};
    use crate::effector::{ConnectionEvent, SceneControl, SceneError, SceneRequest};
    use crate::envelope::RecordData;
    use crate::notify::VfxCatalog;
    use crate::suppression::SuppressionConfig;
    use crate::tts::TtsService;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct NullScene {
        events: broadcast::Sender<ConnectionEvent>,
    }

    #[async_trait]
    impl SceneControl for NullScene {
        async fn connect(&self) -> Result<(), SceneError> {
            Ok(())
        }
        async fn disconnect(&self) {}
        async fn call(&self, _request: SceneRequest) -> Result<serde_json::Value, SceneError> {
            Ok(serde_json::Value::Null)
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
            self.events.subscribe()
        }
    }

    fn router_with(settings: Settings) -> EventRouter {
        let settings = Arc::new(settings);
        let (events, _) = broadcast::channel(4);
        let (display, _daemon) = DisplayQueue::new(
            DisplayConfig::default(),
            Arc::new(NullScene { events }),
        );
        let manager = Arc::new(NotificationManager::new(
            Arc::clone(&settings),
            display,
            TtsService::unconfigured(),
            VfxCatalog::built_in(),
        ));
        let store = SuppressionStore::new(SuppressionConfig {
            combo_timeout: Duration::from_millis(100),
            ..SuppressionConfig::default()
        });
        EventRouter::new(settings, store, manager, EventBus::new())
    }

    fn default_router() -> EventRouter {
        router_with(Settings::default())
    }

    fn gift_record(id: &str, group: Option<&str>, count: i64, repeat_end: bool) -> EventRecord {
        EventRecord {
            platform: "tiktok".to_string(),
            kind: "gift".to_string(),
            id: Some(id.to_string()),
            timestamp: Some(chrono::Utc::now()),
            username: Some("fan".to_string()),
            user_id: Some(serde_json::json!("42")),
            data: RecordData {
                gift_type: Some("Rose".to_string()),
                gift_count: Some(count),
                amount: Some(0.1),
                currency: Some("USD".to_string()),
                group_id: group.map(str::to_string),
                repeat_end: Some(repeat_end),
                monotonic: Some(true),
                ..RecordData::default()
            },
            correlation_id: None,
        }
    }

    fn follow_record() -> EventRecord {
        EventRecord {
            platform: "twitch".to_string(),
            kind: "follow".to_string(),
            id: None,
            timestamp: Some(chrono::Utc::now()),
            username: Some("new_follower".to_string()),
            user_id: Some(serde_json::json!("55")),
            data: RecordData::default(),
            correlation_id: None,
        }
    }

    #[tokio::test]
    async fn test_paid_alias_is_rejected_with_descriptive_error() {
        let mut router = default_router();
        let mut record = follow_record();
        record.kind = "subscription".to_string();

        let error = router.route_record(&record, Instant::now()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unsupported paid alias event type: subscription"
        );

        // The canonical name routes fine.
        record.kind = "paypiggy".to_string();
        record.id = Some("p-1".to_string());
        record.data.gift_type = Some("tier 1".to_string());
        record.data.gift_count = Some(1);
        record.data.amount = Some(4.99);
        record.data.currency = Some("USD".to_string());
        let outcome = router.route_record(&record, Instant::now()).unwrap();
        assert!(matches!(outcome, RouteOutcome::Notified(o) if o.success()));
    }

    #[tokio::test]
    async fn test_follow_gate_disabled_drops_silently() {
        let mut settings = Settings::default();
        settings.general.follows_enabled = false;
        let mut router = router_with(settings);

        let outcome = router
            .route_record(&follow_record(), Instant::now())
            .unwrap();
        assert_eq!(outcome, RouteOutcome::GateDisabled);
    }

    #[tokio::test]
    async fn test_duplicate_id_routes_once() {
        let mut router = default_router();
        let now = Instant::now();

        let first = router
            .route_record(&gift_record("x", None, 1, true), now)
            .unwrap();
        assert!(matches!(first, RouteOutcome::Notified(_)));

        let second = router
            .route_record(&gift_record("x", None, 1, true), now)
            .unwrap();
        assert_eq!(second, RouteOutcome::Duplicate);
    }

    #[tokio::test]
    async fn test_combo_accumulates_then_sweep_forwards() {
        let mut router = default_router();
        let t0 = Instant::now();

        assert_eq!(
            router
                .route_record(&gift_record("a", Some("g1"), 1, false), t0)
                .unwrap(),
            RouteOutcome::Accumulated
        );
        assert_eq!(
            router
                .route_record(&gift_record("b", Some("g1"), 2, false), t0)
                .unwrap(),
            RouteOutcome::Accumulated
        );

        // Idle past the combo timeout: the sweep forwards one aggregate.
        assert_eq!(router.sweep(t0 + Duration::from_millis(200)), 1);
        // Nothing left to settle.
        assert_eq!(router.sweep(t0 + Duration::from_secs(1)), 0);
    }

    #[tokio::test]
    async fn test_viewer_count_invokes_handler() {
        let mut router = default_router();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        router.on_viewer_count(Arc::new(move |platform, count| {
            seen_clone.lock().unwrap().push((platform, count));
        }));

        let record = EventRecord {
            platform: "youtube".to_string(),
            kind: "viewer-count".to_string(),
            id: None,
            timestamp: Some(chrono::Utc::now()),
            username: None,
            user_id: None,
            data: RecordData {
                count: Some(152.0),
                ..RecordData::default()
            },
            correlation_id: None,
        };

        let outcome = router.route_record(&record, Instant::now()).unwrap();
        assert_eq!(outcome, RouteOutcome::Handled);
        assert_eq!(*seen.lock().unwrap(), vec![(Platform::Youtube, 152)]);
    }

    #[tokio::test]
    async fn test_validated_envelopes_reach_the_bus() {
        let mut router = default_router();
        let seen = Arc::new(std::sync::Mutex::new(0usize));
        let seen_clone = Arc::clone(&seen);
        let _subscription = router.bus.subscribe("twitch:event", move |message| {
            if message.envelope().is_some() {
                *seen_clone.lock().unwrap() += 1;
            }
            Ok(())
        });

        router
            .route_record(&follow_record(), Instant::now())
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), 1);

        // An invalid record never reaches the bus.
        let mut broken = follow_record();
        broken.username = None;
        assert!(router.route_record(&broken, Instant::now()).is_err());
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
