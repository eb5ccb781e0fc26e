//! Display queue for the overlay.
//!
//! Serializes notification artifacts onto shared overlay resources through
//! the scene-control effector. Two logical slots: `chat` is rolling
//! (last writer wins), `notification` is exclusive (at most one active,
//! picked by priority with FIFO ties). The queue owns the readiness
//! contract: no scene call is issued before the effector has identified;
//! earlier calls are held in a bounded most-recent buffer and flushed on
//! `Identified`.

mod queue;

pub use queue::{DisplayDaemon, DisplayQueue};

use std::time::Duration;

use crate::config::Settings;
use crate::envelope::Platform;

/// Strict boolean used for the TTS coupling flag.
///
/// Only the literal `true` (or the quoted string `'true'`) enables;
/// everything else, including `yes` and `1`, disables.
pub fn strict_bool(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "'true'" | "\"true\"")
}

/// Display queue tuning, derived from `[obs]` and `[timing]` settings.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub chat_group: String,
    pub notification_group: String,
    /// Text source inside the chat group.
    pub chat_text_source: String,
    /// Text source inside the notification group.
    pub notification_text_source: String,
    pub chat_platform_logos: [(Platform, String); 3],
    pub notification_platform_logos: [(Platform, String); 3],
    pub chat_message_duration: Duration,
    pub notification_clear_delay: Duration,
    /// A higher-priority arrival ends the active item immediately.
    pub preemption: bool,
    /// Most-recent scene calls buffered before the effector identifies.
    pub readiness_buffer_size: usize,
    /// Raw TTS flag; see [`strict_bool`].
    pub tts_enabled_raw: String,
}

impl DisplayConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let obs = &settings.obs;
        Self {
            chat_group: obs.chat_msg_group.clone(),
            notification_group: obs.notification_msg_group.clone(),
            chat_text_source: "ChatText".to_string(),
            notification_text_source: "NotificationText".to_string(),
            chat_platform_logos: [
                (Platform::Twitch, obs.chat_platform_logo_twitch.clone()),
                (Platform::Youtube, obs.chat_platform_logo_youtube.clone()),
                (Platform::Tiktok, obs.chat_platform_logo_tiktok.clone()),
            ],
            notification_platform_logos: [
                (
                    Platform::Twitch,
                    obs.notification_platform_logo_twitch.clone(),
                ),
                (
                    Platform::Youtube,
                    obs.notification_platform_logo_youtube.clone(),
                ),
                (
                    Platform::Tiktok,
                    obs.notification_platform_logo_tiktok.clone(),
                ),
            ],
            chat_message_duration: Duration::from_millis(settings.timing.chat_message_duration),
            notification_clear_delay: Duration::from_millis(
                settings.timing.notification_clear_delay,
            ),
            preemption: false,
            readiness_buffer_size: crate::config::DEFAULT_READINESS_BUFFER_SIZE,
            tts_enabled_raw: settings.tts.enabled_raw.clone(),
        }
    }

    pub(crate) fn chat_logo(&self, platform: Platform) -> &str {
        self.chat_platform_logos
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, name)| name.as_str())
            .unwrap_or("")
    }

    pub(crate) fn notification_logo(&self, platform: Platform) -> &str {
        self.notification_platform_logos
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, name)| name.as_str())
            .unwrap_or("")
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_bool_accepts_only_literal_true() {
        assert!(strict_bool("true"));
        assert!(strict_bool("'true'"));
        assert!(strict_bool(" true "));

        // INI-style truthy values are NOT enough for the TTS coupling.
        assert!(!strict_bool("yes"));
        assert!(!strict_bool("1"));
        assert!(!strict_bool("TRUE"));
        assert!(!strict_bool("True"));
        assert!(!strict_bool("on"));
        assert!(!strict_bool(""));
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = Settings::default();
        settings.obs.chat_msg_group = "MyChat".to_string();
        settings.timing.notification_clear_delay = 750;
        settings.tts.enabled_raw = "true".to_string();

        let config = DisplayConfig::from_settings(&settings);
        assert_eq!(config.chat_group, "MyChat");
        assert_eq!(
            config.notification_clear_delay,
            Duration::from_millis(750)
        );
        assert!(strict_bool(&config.tts_enabled_raw));
        assert!(!config.preemption);
    }

    #[test]
    fn test_logo_lookup() {
        let config = DisplayConfig::default();
        assert_eq!(config.chat_logo(Platform::Twitch), "ChatLogoTwitch");
        assert_eq!(
            config.notification_logo(Platform::Tiktok),
            "NotificationLogoTiktok"
        );
    }
}
