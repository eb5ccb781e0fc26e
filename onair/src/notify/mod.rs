//! Notification manager.
//!
//! Builds the user-facing artifacts (display / TTS / log renderings) for
//! admitted events and hands them to the display queue. Side effects (goal
//! tracking, user tracking, VFX, TTS) are each guarded: a failure is logged
//! and the notification still enqueues. Outcomes are typed values; nothing
//! here throws across the component boundary.

mod artifact;
mod builder;
mod goals;
mod priority;
mod sanitize;
mod users;
mod vfx;

pub use artifact::{ArtifactKind, NotificationArtifact, Slot};
pub use builder::{build_messages, format_amount, spoken_amount, BuiltMessages};
pub use goals::{DonationGoals, GoalSnapshot};
pub use priority::priority_for;
pub use sanitize::{sanitize_text, truncate_chars};
pub use users::{UserRecord, UserTracker};
pub use vfx::{VfxCatalog, VfxConfig, VfxRule};

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::config::Settings;
use crate::display::DisplayQueue;
use crate::envelope::{EventEnvelope, EventRecord, Platform};
use crate::tts::{SpeakOptions, TtsService};

/// Longest username rendered into messages.
const MAX_USERNAME_CHARS: usize = 50;

/// Typed result of a notification request.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// Artifact built and handed to the display queue.
    Enqueued { artifact_id: String },
    /// A feature gate is off; not an error.
    Disabled,
    /// Input guard violated; names the offending field.
    Invalid(&'static str),
}

impl NotifyOutcome {
    pub fn success(&self) -> bool {
        matches!(self, NotifyOutcome::Enqueued { .. })
    }
}

/// Builds artifacts and orchestrates side effects.
pub struct NotificationManager {
    settings: Arc<Settings>,
    display: DisplayQueue,
    tts: TtsService,
    goals: Mutex<DonationGoals>,
    users: Mutex<UserTracker>,
    vfx: VfxCatalog,
}

impl NotificationManager {
    pub fn new(
        settings: Arc<Settings>,
        display: DisplayQueue,
        tts: TtsService,
        vfx: VfxCatalog,
    ) -> Self {
        Self {
            settings,
            display,
            tts,
            goals: Mutex::new(DonationGoals::new()),
            users: Mutex::new(UserTracker::new()),
            vfx,
        }
    }

    /// Loose-input entry: guards field types before validation.
    ///
    /// Returns `Invalid("platform")` for a blank platform instead of
    /// letting validation produce a less specific error.
    pub fn handle_parts(&self, platform: &str, kind: &str, record: &EventRecord) -> NotifyOutcome {
        if platform.trim().is_empty() {
            return NotifyOutcome::Invalid("platform");
        }
        if kind.trim().is_empty() {
            return NotifyOutcome::Invalid("type");
        }

        let mut record = record.clone();
        record.platform = platform.to_string();
        record.kind = kind.to_string();

        match EventEnvelope::try_from_record(&record) {
            Ok(envelope) => {
                if envelope.kind == crate::envelope::EventKind::Chat {
                    self.handle_chat(&envelope)
                } else {
                    self.handle_event(&envelope)
                }
            }
            Err(error) => {
                warn!(%error, "notification input failed validation");
                NotifyOutcome::Invalid("envelope")
            }
        }
    }

    /// Build and enqueue the artifact for a notification-bearing event.
    pub fn handle_event(&self, envelope: &EventEnvelope) -> NotifyOutcome {
        let platform_settings = self.settings.platform(envelope.platform);
        if !platform_settings.notifications_enabled {
            return NotifyOutcome::Disabled;
        }

        let username = self.render_username(envelope);
        let (kind, messages) = build_messages(
            envelope,
            &username,
            false,
            self.settings.general.max_message_length,
        );

        self.run_side_effects(envelope, kind, &messages);
        self.enqueue(envelope, kind, username, messages)
    }

    /// Lightweight chat path: tracks the user, upgrades a first message to
    /// a greeting, and rolls the chat line.
    pub fn handle_chat(&self, envelope: &EventEnvelope) -> NotifyOutcome {
        let platform_settings = self.settings.platform(envelope.platform);
        if !platform_settings.messages_enabled {
            return NotifyOutcome::Disabled;
        }

        let first_message = match self.users.lock() {
            Ok(mut users) => {
                users.record_message(envelope.platform, envelope.user_id.as_str())
            }
            Err(_) => {
                warn!("user tracker lock poisoned; first-message flag lost");
                false
            }
        };

        let username = self.render_username(envelope);
        let (kind, messages) = build_messages(
            envelope,
            &username,
            first_message,
            self.settings.general.max_message_length,
        );

        if kind == ArtifactKind::Greeting {
            self.run_side_effects(envelope, kind, &messages);
        }
        self.enqueue(envelope, kind, username, messages)
    }

    /// Runtime-generated command response (e.g. a chat command reply).
    pub fn notify_command(
        &self,
        platform: Platform,
        username: &str,
        text: &str,
    ) -> NotifyOutcome {
        if !self.settings.platform(platform).notifications_enabled {
            return NotifyOutcome::Disabled;
        }

        let max = self.settings.general.max_message_length;
        let username = sanitize_text(username, MAX_USERNAME_CHARS);
        let display = sanitize_text(text, max);
        if display.is_empty() {
            return NotifyOutcome::Invalid("text");
        }

        let created_at = chrono::Utc::now();
        let artifact = NotificationArtifact {
            id: format!("command-{}-{}", platform, created_at.timestamp_millis()),
            kind: ArtifactKind::Command,
            platform,
            username,
            tts_message: display.clone(),
            log_message: format!("platform={platform} kind=command text={display}"),
            display_message: display,
            priority: priority_for(ArtifactKind::Command),
            duration_ms: self.settings.timing.notification_duration,
            created_at,
            vfx: None,
        };
        let artifact_id = artifact.id.clone();
        self.display.add_item(artifact);
        NotifyOutcome::Enqueued { artifact_id }
    }

    /// Accumulated donation totals.
    pub fn goal_snapshot(&self) -> GoalSnapshot {
        match self.goals.lock() {
            Ok(goals) => goals.snapshot(),
            Err(_) => GoalSnapshot::default(),
        }
    }

    /// Distinct users seen this session.
    pub fn users_seen(&self) -> usize {
        match self.users.lock() {
            Ok(users) => users.len(),
            Err(_) => 0,
        }
    }

    fn render_username(&self, envelope: &EventEnvelope) -> String {
        let sanitized = sanitize_text(&envelope.username, MAX_USERNAME_CHARS);
        if sanitized.is_empty() {
            // A name of pure emoji sanitizes away; fall back to the id so
            // the display line still names someone.
            envelope.user_id.as_str().to_string()
        } else {
            sanitized
        }
    }

    /// Side effects, each isolated so one failure never drops the artifact.
    fn run_side_effects(
        &self,
        envelope: &EventEnvelope,
        kind: ArtifactKind,
        messages: &BuiltMessages,
    ) {
        if let Some(gift) = envelope.data.gift() {
            match self.goals.lock() {
                Ok(mut goals) => goals.record(gift.amount, &gift.currency),
                Err(_) => warn!("goal tracker lock poisoned; contribution lost"),
            }
        }

        match self.users.lock() {
            Ok(mut users) => {
                users.record_notification(envelope.platform, envelope.user_id.as_str())
            }
            Err(_) => warn!("user tracker lock poisoned; notification count lost"),
        }

        if self.tts_enabled_for(envelope.platform) {
            let spoken = self.tts.speak(
                &messages.tts,
                SpeakOptions {
                    monetized: kind.is_monetized(),
                },
            );
            if spoken.is_none() {
                tracing::debug!(kind = %kind, "tts request not queued");
            }
        }
    }

    fn tts_enabled_for(&self, platform: Platform) -> bool {
        self.display.is_tts_enabled()
            && self.settings.general.tts_enabled
            && self.settings.platform(platform).tts_enabled
    }

    fn enqueue(
        &self,
        envelope: &EventEnvelope,
        kind: ArtifactKind,
        username: String,
        messages: BuiltMessages,
    ) -> NotifyOutcome {
        let vfx = self.vfx.match_effect(kind, envelope.data.gift());

        let duration_ms = match kind.slot() {
            Slot::Chat => self.settings.timing.chat_message_duration,
            Slot::Notification => self.settings.timing.notification_duration,
        };

        let artifact = NotificationArtifact {
            id: artifact_id(envelope, kind),
            kind,
            platform: envelope.platform,
            username,
            display_message: messages.display,
            tts_message: messages.tts,
            log_message: messages.log,
            priority: priority_for(kind),
            duration_ms,
            created_at: envelope.timestamp,
            vfx,
        };

        tracing::info!(target: "onair::audit", "{}", artifact.log_message);

        let artifact_id = artifact.id.clone();
        self.display.add_item(artifact);
        NotifyOutcome::Enqueued { artifact_id }
    }
}

/// Stable artifact id: the envelope id when present, otherwise derived
/// from platform, kind and timestamp (deterministic under a fixed clock).
fn artifact_id(envelope: &EventEnvelope, kind: ArtifactKind) -> String {
    match &envelope.id {
        Some(id) => id.clone(),
        None => format!(
            "{}-{}-{}",
            envelope.platform,
            kind,
            envelope.timestamp.timestamp_millis()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayConfig;
    use crate::effector::{ConnectionEvent, SceneControl, SceneError, SceneRequest};
    use crate::envelope::{CountSemantics, EventKind, GiftData, UserId};
    use async_trait::async_trait;
    use tokio::sync::broadcast;

    struct NullScene {
        events: broadcast::Sender<ConnectionEvent>,
    }

    impl NullScene {
        fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(4);
            Arc::new(Self { events })
        }
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

    fn manager_with(settings: Settings) -> NotificationManager {
        let settings = Arc::new(settings);
        let (display, _daemon) =
            crate::display::DisplayQueue::new(DisplayConfig::default(), NullScene::new());
        NotificationManager::new(
            settings,
            display,
            TtsService::unconfigured(),
            VfxCatalog::built_in(),
        )
    }

    fn enabled_settings() -> Settings {
        let mut settings = Settings::default();
        settings.tiktok.enabled = true;
        settings.twitch.enabled = true;
        settings
    }

    fn gift_envelope() -> EventEnvelope {
        EventEnvelope {
            platform: Platform::Tiktok,
            kind: EventKind::Gift,
            id: Some("g-1".to_string()),
            timestamp: chrono::Utc::now(),
            username: "fan".to_string(),
            user_id: UserId::new("42"),
            data: crate::envelope::EventData::Gift(GiftData {
                gift_type: "Rose".to_string(),
                gift_count: 3,
                amount: 0.3,
                currency: "USD".to_string(),
                group_id: None,
                repeat_end: true,
                count_semantics: CountSemantics::Delta,
                is_error: false,
            }),
            correlation_id: None,
        }
    }

    #[tokio::test]
    async fn test_gift_enqueues_and_records_goal() {
        let manager = manager_with(enabled_settings());

        let outcome = manager.handle_event(&gift_envelope());
        assert_eq!(
            outcome,
            NotifyOutcome::Enqueued {
                artifact_id: "g-1".to_string()
            }
        );

        let snapshot = manager.goal_snapshot();
        assert_eq!(snapshot.totals.get("USD"), Some(&0.3));
        assert_eq!(snapshot.contribution_count, 1);
    }

    #[tokio::test]
    async fn test_disabled_platform_notifications() {
        let mut settings = enabled_settings();
        settings.tiktok.notifications_enabled = false;
        let manager = manager_with(settings);

        assert_eq!(manager.handle_event(&gift_envelope()), NotifyOutcome::Disabled);
        // Nothing recorded for a disabled notification.
        assert_eq!(manager.goal_snapshot().contribution_count, 0);
    }

    #[tokio::test]
    async fn test_blank_platform_is_invalid() {
        let manager = manager_with(enabled_settings());
        let record = EventRecord::from_envelope(&gift_envelope());

        let outcome = manager.handle_parts("  ", "gift", &record);
        assert_eq!(outcome, NotifyOutcome::Invalid("platform"));
    }

    #[tokio::test]
    async fn test_first_chat_message_greets() {
        let manager = manager_with(enabled_settings());

        let chat = EventEnvelope {
            kind: EventKind::Chat,
            id: None,
            data: crate::envelope::EventData::Chat {
                text: "hello!".to_string(),
            },
            ..gift_envelope()
        };

        let first = manager.handle_chat(&chat);
        assert!(first.success());
        // The user is now known; the second message is a plain chat line.
        let second = manager.handle_chat(&chat);
        assert!(second.success());
        assert_eq!(manager.users_seen(), 1);
    }

    #[tokio::test]
    async fn test_emoji_username_falls_back_to_id() {
        let manager = manager_with(enabled_settings());
        let mut envelope = gift_envelope();
        envelope.username = "🎉🎉".to_string();

        let username = manager.render_username(&envelope);
        assert_eq!(username, "42");
    }

    #[tokio::test]
    async fn test_command_notification() {
        let manager = manager_with(enabled_settings());
        let outcome = manager.notify_command(Platform::Twitch, "mod", "hype train started");
        assert!(outcome.success());

        let invalid = manager.notify_command(Platform::Twitch, "mod", "🎉");
        assert_eq!(invalid, NotifyOutcome::Invalid("text"));
    }
}
