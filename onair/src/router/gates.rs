//! Feature gates.
//!
//! Every canonical kind maps to one enable flag, checked globally and
//! per-platform; a disabled gate at either level drops the event silently.

use crate::config::{GeneralSettings, PlatformSettings};
use crate::envelope::EventKind;

/// True when both the global and the platform gate for `kind` are open.
pub fn gate_allows(
    general: &GeneralSettings,
    platform: &PlatformSettings,
    kind: EventKind,
) -> bool {
    match kind {
        EventKind::Chat => general.messages_enabled && platform.messages_enabled,
        EventKind::Follow => general.follows_enabled && platform.follows_enabled,
        EventKind::Gift | EventKind::EnvelopeGift | EventKind::GiftPaypiggy => {
            general.gifts_enabled && platform.gifts_enabled
        }
        EventKind::Paypiggy => general.paypiggies_enabled && platform.paypiggies_enabled,
        EventKind::Raid => general.raids_enabled && platform.raids_enabled,
        EventKind::Share => general.shares_enabled && platform.shares_enabled,
        EventKind::Cheer => general.cheers_enabled && platform.cheers_enabled,
        EventKind::Redemption => general.redemptions_enabled && platform.redemptions_enabled,
        // Stream telemetry is never gated; the overlay needs it to track
        // live state.
        EventKind::ViewerCount | EventKind::StreamStatus => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_gate_closes_for_all_platforms() {
        let general = GeneralSettings {
            follows_enabled: false,
            ..GeneralSettings::default()
        };
        let platform = PlatformSettings::default();
        assert!(!gate_allows(&general, &platform, EventKind::Follow));
        assert!(gate_allows(&general, &platform, EventKind::Chat));
    }

    #[test]
    fn test_platform_gate_closes_independently() {
        let general = GeneralSettings::default();
        let platform = PlatformSettings {
            gifts_enabled: false,
            ..PlatformSettings::default()
        };
        assert!(!gate_allows(&general, &platform, EventKind::Gift));
        assert!(!gate_allows(&general, &platform, EventKind::EnvelopeGift));
        assert!(!gate_allows(&general, &platform, EventKind::GiftPaypiggy));
        assert!(gate_allows(&general, &platform, EventKind::Paypiggy));
    }

    #[test]
    fn test_telemetry_is_never_gated() {
        let general = GeneralSettings {
            messages_enabled: false,
            gifts_enabled: false,
            ..GeneralSettings::default()
        };
        let platform = PlatformSettings {
            messages_enabled: false,
            ..PlatformSettings::default()
        };
        assert!(gate_allows(&general, &platform, EventKind::ViewerCount));
        assert!(gate_allows(&general, &platform, EventKind::StreamStatus));
    }
}
