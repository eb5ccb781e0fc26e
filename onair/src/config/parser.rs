//! INI parsing logic for converting `Ini` → `Settings`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::{PlatformSettings, Settings};

/// Parse an `Ini` object into `Settings`.
///
/// Starts from `Settings::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<Settings, ConfigFileError> {
    let mut config = Settings::default();

    // [general] section
    if let Some(section) = ini.section(Some("general")) {
        if let Some(v) = section.get("debug_enabled") {
            config.general.debug_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("messages_enabled") {
            config.general.messages_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("gifts_enabled") {
            config.general.gifts_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("paypiggies_enabled") {
            config.general.paypiggies_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("follows_enabled") {
            config.general.follows_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("raids_enabled") {
            config.general.raids_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("shares_enabled") {
            config.general.shares_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("cheers_enabled") {
            config.general.cheers_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("redemptions_enabled") {
            config.general.redemptions_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("tts_enabled") {
            config.general.tts_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("suppression_enabled") {
            config.general.suppression_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("max_notifications_per_user") {
            config.general.max_notifications_per_user =
                parse_number(v, "general", "max_notifications_per_user")?;
        }
        if let Some(v) = section.get("suppression_window_ms") {
            config.general.suppression_window_ms =
                parse_number(v, "general", "suppression_window_ms")?;
        }
        if let Some(v) = section.get("suppression_duration_ms") {
            config.general.suppression_duration_ms =
                parse_number(v, "general", "suppression_duration_ms")?;
        }
        if let Some(v) = section.get("suppression_cleanup_interval_ms") {
            config.general.suppression_cleanup_interval_ms =
                parse_number(v, "general", "suppression_cleanup_interval_ms")?;
        }
        if let Some(v) = section.get("dedup_ttl_ms") {
            config.general.dedup_ttl_ms = parse_number(v, "general", "dedup_ttl_ms")?;
        }
        if let Some(v) = section.get("combo_timeout_ms") {
            config.general.combo_timeout_ms = parse_number(v, "general", "combo_timeout_ms")?;
        }
        if let Some(v) = section.get("store_max_entries") {
            config.general.store_max_entries = parse_number(v, "general", "store_max_entries")?;
        }
        if let Some(v) = section.get("stream_detection_enabled") {
            config.general.stream_detection_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("stream_retry_interval") {
            config.general.stream_retry_interval =
                parse_number(v, "general", "stream_retry_interval")?;
        }
        if let Some(v) = section.get("stream_max_retries") {
            config.general.stream_max_retries =
                v.trim()
                    .parse()
                    .map_err(|_| ConfigFileError::InvalidValue {
                        section: "general".to_string(),
                        key: "stream_max_retries".to_string(),
                        value: v.to_string(),
                        reason: "must be an integer (negative retries forever)".to_string(),
                    })?;
        }
        if let Some(v) = section.get("continuous_monitoring_interval") {
            config.general.continuous_monitoring_interval =
                parse_number(v, "general", "continuous_monitoring_interval")?;
        }
        if let Some(v) = section.get("viewer_count_polling_interval") {
            config.general.viewer_count_polling_interval =
                parse_number(v, "general", "viewer_count_polling_interval")?;
        }
        if let Some(v) = section.get("max_message_length") {
            config.general.max_message_length = parse_number(v, "general", "max_message_length")?;
        }
    }

    // Platform sections share one key layout.
    parse_platform_section(ini, "twitch", &mut config.twitch);
    parse_platform_section(ini, "youtube", &mut config.youtube);
    parse_platform_section(ini, "tiktok", &mut config.tiktok);

    // [obs] section
    if let Some(section) = ini.section(Some("obs")) {
        if let Some(v) = section.get("enabled") {
            config.obs.enabled = parse_bool(v);
        }
        if let Some(v) = section.get("address") {
            let v = v.trim();
            if !v.is_empty() {
                config.obs.address = v.to_string();
            }
        }
        if let Some(v) = section.get("password") {
            let v = v.trim();
            if !v.is_empty() {
                config.obs.password = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("connection_timeout_ms") {
            config.obs.connection_timeout_ms = parse_number(v, "obs", "connection_timeout_ms")?;
        }
        if let Some(v) = section.get("chat_msg_group") {
            set_if_nonempty(&mut config.obs.chat_msg_group, v);
        }
        if let Some(v) = section.get("notification_msg_group") {
            set_if_nonempty(&mut config.obs.notification_msg_group, v);
        }
        if let Some(v) = section.get("chat_platform_logo_twitch") {
            set_if_nonempty(&mut config.obs.chat_platform_logo_twitch, v);
        }
        if let Some(v) = section.get("chat_platform_logo_youtube") {
            set_if_nonempty(&mut config.obs.chat_platform_logo_youtube, v);
        }
        if let Some(v) = section.get("chat_platform_logo_tiktok") {
            set_if_nonempty(&mut config.obs.chat_platform_logo_tiktok, v);
        }
        if let Some(v) = section.get("notification_platform_logo_twitch") {
            set_if_nonempty(&mut config.obs.notification_platform_logo_twitch, v);
        }
        if let Some(v) = section.get("notification_platform_logo_youtube") {
            set_if_nonempty(&mut config.obs.notification_platform_logo_youtube, v);
        }
        if let Some(v) = section.get("notification_platform_logo_tiktok") {
            set_if_nonempty(&mut config.obs.notification_platform_logo_tiktok, v);
        }
    }

    // [tts] section
    if let Some(section) = ini.section(Some("tts")) {
        if let Some(v) = section.get("enabled") {
            // Kept raw: the display queue applies the strict-boolean rule.
            config.tts.enabled_raw = v.trim().to_string();
        }
        if let Some(v) = section.get("only_for_gifts") {
            config.tts.only_for_gifts = parse_bool(v);
        }
        if let Some(v) = section.get("deduplication_enabled") {
            config.tts.deduplication_enabled = parse_bool(v);
        }
        if let Some(v) = section.get("provider") {
            set_if_nonempty(&mut config.tts.provider, v);
        }
        if let Some(v) = section.get("fallback_provider") {
            set_if_nonempty(&mut config.tts.fallback_provider, v);
        }
    }

    // [timing] section
    if let Some(section) = ini.section(Some("timing")) {
        if let Some(v) = section.get("fade_duration") {
            config.timing.fade_duration = parse_number(v, "timing", "fade_duration")?;
        }
        if let Some(v) = section.get("transition_delay") {
            config.timing.transition_delay = parse_number(v, "timing", "transition_delay")?;
        }
        if let Some(v) = section.get("chat_message_duration") {
            config.timing.chat_message_duration =
                parse_number(v, "timing", "chat_message_duration")?;
        }
        if let Some(v) = section.get("notification_clear_delay") {
            config.timing.notification_clear_delay =
                parse_number(v, "timing", "notification_clear_delay")?;
        }
        if let Some(v) = section.get("notification_duration") {
            config.timing.notification_duration =
                parse_number(v, "timing", "notification_duration")?;
        }
    }

    Ok(config)
}

fn parse_platform_section(ini: &Ini, name: &str, settings: &mut PlatformSettings) {
    let Some(section) = ini.section(Some(name)) else {
        return;
    };

    if let Some(v) = section.get("enabled") {
        settings.enabled = parse_bool(v);
    }
    if let Some(v) = section.get("username") {
        settings.username = v.trim().to_string();
    }
    if let Some(v) = section.get("notifications_enabled") {
        settings.notifications_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("messages_enabled") {
        settings.messages_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("gifts_enabled") {
        settings.gifts_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("paypiggies_enabled") {
        settings.paypiggies_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("follows_enabled") {
        settings.follows_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("raids_enabled") {
        settings.raids_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("shares_enabled") {
        settings.shares_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("cheers_enabled") {
        settings.cheers_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("redemptions_enabled") {
        settings.redemptions_enabled = parse_bool(v);
    }
    if let Some(v) = section.get("tts_enabled") {
        settings.tts_enabled = parse_bool(v);
    }
}

/// Parse a boolean value from a config string.
///
/// Accepts true/yes/1 as true (case-insensitive); false/no/0 and anything
/// unrecognized parse as false.
pub fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes"
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    section: &str,
    key: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a non-negative integer".to_string(),
        })
}

fn set_if_nonempty(target: &mut String, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        *target = value.to_string();
    }
}
