//! Configuration settings structs.
//!
//! `ConfigFile` mirrors the INI sections one-to-one. `Settings` is the
//! frozen, `Arc`-shared form the pipeline consumes; it is just the parsed
//! file plus accessors keyed by [`Platform`].

use std::time::Duration;

use super::defaults::*;
use crate::envelope::Platform;

/// `[general]` section: global feature gates and pipeline tuning.
#[derive(Debug, Clone)]
pub struct GeneralSettings {
    /// Verbose diagnostics logging.
    pub debug_enabled: bool,
    /// Global gate for chat messages.
    pub messages_enabled: bool,
    /// Global gate for gift/envelope/gift-membership events.
    pub gifts_enabled: bool,
    /// Global gate for paid membership events.
    pub paypiggies_enabled: bool,
    /// Global gate for follow events.
    pub follows_enabled: bool,
    /// Global gate for raid events.
    pub raids_enabled: bool,
    /// Global gate for share events.
    pub shares_enabled: bool,
    /// Global gate for cheer events.
    pub cheers_enabled: bool,
    /// Global gate for channel-point redemptions.
    pub redemptions_enabled: bool,
    /// Master text-to-speech switch.
    pub tts_enabled: bool,
    /// Per-user rate limiting (off by default).
    pub suppression_enabled: bool,
    pub max_notifications_per_user: u32,
    pub suppression_window_ms: u64,
    pub suppression_duration_ms: u64,
    pub suppression_cleanup_interval_ms: u64,
    pub dedup_ttl_ms: u64,
    pub combo_timeout_ms: u64,
    pub store_max_entries: usize,
    pub stream_detection_enabled: bool,
    /// Seconds between stream-detection attempts.
    pub stream_retry_interval: u64,
    /// Detection attempts before giving up; negative retries forever.
    pub stream_max_retries: i32,
    /// Seconds between liveness probes once connected.
    pub continuous_monitoring_interval: u64,
    /// Seconds between viewer-count polls.
    pub viewer_count_polling_interval: u64,
    pub max_message_length: usize,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug_enabled: false,
            messages_enabled: true,
            gifts_enabled: true,
            paypiggies_enabled: true,
            follows_enabled: true,
            raids_enabled: true,
            shares_enabled: true,
            cheers_enabled: true,
            redemptions_enabled: true,
            tts_enabled: false,
            suppression_enabled: false,
            max_notifications_per_user: DEFAULT_MAX_NOTIFICATIONS_PER_USER,
            suppression_window_ms: DEFAULT_SUPPRESSION_WINDOW_MS,
            suppression_duration_ms: DEFAULT_SUPPRESSION_DURATION_MS,
            suppression_cleanup_interval_ms: DEFAULT_SUPPRESSION_CLEANUP_INTERVAL_MS,
            dedup_ttl_ms: DEFAULT_DEDUP_TTL_MS,
            combo_timeout_ms: DEFAULT_COMBO_TIMEOUT_MS,
            store_max_entries: DEFAULT_STORE_MAX_ENTRIES,
            stream_detection_enabled: true,
            stream_retry_interval: DEFAULT_STREAM_RETRY_INTERVAL_SECS,
            stream_max_retries: DEFAULT_STREAM_MAX_RETRIES,
            continuous_monitoring_interval: DEFAULT_CONTINUOUS_MONITORING_INTERVAL_SECS,
            viewer_count_polling_interval: DEFAULT_VIEWER_COUNT_POLLING_INTERVAL_SECS,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

/// Per-platform section (`[twitch]`, `[youtube]`, `[tiktok]`).
///
/// A platform gate disabled here drops the event even when the matching
/// global gate is enabled.
#[derive(Debug, Clone)]
pub struct PlatformSettings {
    pub enabled: bool,
    /// Channel / account name the adapter should watch.
    pub username: String,
    pub notifications_enabled: bool,
    pub messages_enabled: bool,
    pub gifts_enabled: bool,
    pub paypiggies_enabled: bool,
    pub follows_enabled: bool,
    pub raids_enabled: bool,
    pub shares_enabled: bool,
    pub cheers_enabled: bool,
    pub redemptions_enabled: bool,
    pub tts_enabled: bool,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            username: String::new(),
            notifications_enabled: true,
            messages_enabled: true,
            gifts_enabled: true,
            paypiggies_enabled: true,
            follows_enabled: true,
            raids_enabled: true,
            shares_enabled: true,
            cheers_enabled: true,
            redemptions_enabled: true,
            tts_enabled: true,
        }
    }
}

/// `[obs]` section: scene-control effector addressing and overlay sources.
#[derive(Debug, Clone)]
pub struct ObsSettings {
    pub enabled: bool,
    /// WebSocket address, e.g. `ws://127.0.0.1:4455`.
    pub address: String,
    pub password: Option<String>,
    pub connection_timeout_ms: u64,
    /// Overlay group holding the chat text sources.
    pub chat_msg_group: String,
    /// Overlay group holding the notification text sources.
    pub notification_msg_group: String,
    /// Per-platform logo sources inside the chat group.
    pub chat_platform_logo_twitch: String,
    pub chat_platform_logo_youtube: String,
    pub chat_platform_logo_tiktok: String,
    /// Per-platform logo sources inside the notification group.
    pub notification_platform_logo_twitch: String,
    pub notification_platform_logo_youtube: String,
    pub notification_platform_logo_tiktok: String,
}

impl Default for ObsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            address: DEFAULT_OBS_ADDRESS.to_string(),
            password: None,
            connection_timeout_ms: DEFAULT_OBS_CONNECTION_TIMEOUT_MS,
            chat_msg_group: DEFAULT_CHAT_MSG_GROUP.to_string(),
            notification_msg_group: DEFAULT_NOTIFICATION_MSG_GROUP.to_string(),
            chat_platform_logo_twitch: "ChatLogoTwitch".to_string(),
            chat_platform_logo_youtube: "ChatLogoYoutube".to_string(),
            chat_platform_logo_tiktok: "ChatLogoTiktok".to_string(),
            notification_platform_logo_twitch: "NotificationLogoTwitch".to_string(),
            notification_platform_logo_youtube: "NotificationLogoYoutube".to_string(),
            notification_platform_logo_tiktok: "NotificationLogoTiktok".to_string(),
        }
    }
}

impl ObsSettings {
    /// Logo source name for a platform in the chat group.
    pub fn chat_logo(&self, platform: Platform) -> &str {
        match platform {
            Platform::Twitch => &self.chat_platform_logo_twitch,
            Platform::Youtube => &self.chat_platform_logo_youtube,
            Platform::Tiktok => &self.chat_platform_logo_tiktok,
        }
    }

    /// Logo source name for a platform in the notification group.
    pub fn notification_logo(&self, platform: Platform) -> &str {
        match platform {
            Platform::Twitch => &self.notification_platform_logo_twitch,
            Platform::Youtube => &self.notification_platform_logo_youtube,
            Platform::Tiktok => &self.notification_platform_logo_tiktok,
        }
    }
}

/// `[tts]` section.
#[derive(Debug, Clone)]
pub struct TtsSettings {
    /// Raw configured value. The display queue applies the strict rule:
    /// only the literal strings `true`/`'true'` enable TTS coupling.
    pub enabled_raw: String,
    /// Drop all non-monetization speak requests.
    pub only_for_gifts: bool,
    /// Drop identical consecutive texts inside the dedup window.
    pub deduplication_enabled: bool,
    /// Primary provider command.
    pub provider: String,
    /// Fallback provider command used after a primary failure.
    pub fallback_provider: String,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            enabled_raw: "false".to_string(),
            only_for_gifts: false,
            deduplication_enabled: true,
            provider: DEFAULT_TTS_PROVIDER.to_string(),
            fallback_provider: DEFAULT_TTS_FALLBACK_PROVIDER.to_string(),
        }
    }
}

/// `[timing]` section: overlay pacing in milliseconds.
#[derive(Debug, Clone)]
pub struct TimingSettings {
    pub fade_duration: u64,
    pub transition_delay: u64,
    pub chat_message_duration: u64,
    pub notification_clear_delay: u64,
    pub notification_duration: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            fade_duration: DEFAULT_FADE_DURATION_MS,
            transition_delay: DEFAULT_TRANSITION_DELAY_MS,
            chat_message_duration: DEFAULT_CHAT_MESSAGE_DURATION_MS,
            notification_clear_delay: DEFAULT_NOTIFICATION_CLEAR_DELAY_MS,
            notification_duration: DEFAULT_NOTIFICATION_DURATION_MS,
        }
    }
}

impl TimingSettings {
    pub fn notification_clear_delay_duration(&self) -> Duration {
        Duration::from_millis(self.notification_clear_delay)
    }
}

/// The full frozen configuration record.
///
/// This is the value the runtime shares behind an `Arc`; nothing in the
/// pipeline mutates it after startup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub twitch: PlatformSettings,
    pub youtube: PlatformSettings,
    pub tiktok: PlatformSettings,
    pub obs: ObsSettings,
    pub tts: TtsSettings,
    pub timing: TimingSettings,
}

impl Settings {
    /// Per-platform settings for `platform`.
    pub fn platform(&self, platform: Platform) -> &PlatformSettings {
        match platform {
            Platform::Twitch => &self.twitch,
            Platform::Youtube => &self.youtube,
            Platform::Tiktok => &self.tiktok,
        }
    }

    /// Platforms whose sections are enabled.
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .iter()
            .copied()
            .filter(|p| self.platform(*p).enabled)
            .collect()
    }
}
