//! Typed envelope model.
//!
//! These are the crate's own types, decoupled from any platform SDK shape.
//! The loose wire form lives in [`super::record`]; conversion and the §-style
//! validation rules live in [`super::validate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::validate::ValidationError;

/// Source platform of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    Youtube,
    Tiktok,
}

impl Platform {
    /// All known platforms, in display order.
    pub const ALL: [Platform; 3] = [Platform::Twitch, Platform::Youtube, Platform::Tiktok];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitch => "twitch",
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
        }
    }

    /// Parse a platform name, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_lowercase().as_str() {
            "twitch" => Ok(Platform::Twitch),
            "youtube" => Ok(Platform::Youtube),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(ValidationError::UnknownPlatform(other.to_string())),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical event vocabulary.
///
/// Paid subscriptions are unified as `paypiggy`; platform-specific aliases
/// such as `subscription` are rejected at parse time so no alias can slip
/// through a gate keyed on the canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Chat,
    Follow,
    Gift,
    Paypiggy,
    GiftPaypiggy,
    /// One-shot monetization container (e.g. Treasure Chest).
    EnvelopeGift,
    Raid,
    Share,
    Cheer,
    Redemption,
    ViewerCount,
    StreamStatus,
}

impl EventKind {
    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Chat => "chat",
            EventKind::Follow => "follow",
            EventKind::Gift => "gift",
            EventKind::Paypiggy => "paypiggy",
            EventKind::GiftPaypiggy => "giftpaypiggy",
            EventKind::EnvelopeGift => "envelope",
            EventKind::Raid => "raid",
            EventKind::Share => "share",
            EventKind::Cheer => "cheer",
            EventKind::Redemption => "redemption",
            EventKind::ViewerCount => "viewer-count",
            EventKind::StreamStatus => "stream-status",
        }
    }

    /// Parse a wire name into the canonical vocabulary.
    ///
    /// Known paid aliases are rejected explicitly so the caller gets a
    /// descriptive error rather than a generic unknown-type one.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let v = value.trim().to_lowercase();
        match v.as_str() {
            "chat" => Ok(EventKind::Chat),
            "follow" => Ok(EventKind::Follow),
            "gift" => Ok(EventKind::Gift),
            "paypiggy" => Ok(EventKind::Paypiggy),
            "giftpaypiggy" => Ok(EventKind::GiftPaypiggy),
            "envelope" => Ok(EventKind::EnvelopeGift),
            "raid" => Ok(EventKind::Raid),
            "share" => Ok(EventKind::Share),
            "cheer" => Ok(EventKind::Cheer),
            "redemption" => Ok(EventKind::Redemption),
            "viewer-count" => Ok(EventKind::ViewerCount),
            "stream-status" => Ok(EventKind::StreamStatus),
            "subscription" | "sub" | "membership" | "sponsor" => {
                Err(ValidationError::UnsupportedPaidAlias(v))
            }
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }

    /// Monetized kinds require id, gift type, count, amount and currency.
    pub fn is_monetized(&self) -> bool {
        matches!(
            self,
            EventKind::Gift
                | EventKind::Paypiggy
                | EventKind::GiftPaypiggy
                | EventKind::EnvelopeGift
                | EventKind::Cheer
        )
    }

    /// Kinds that flow to the notification manager (everything except the
    /// lightweight chat / status kinds handled directly by the runtime).
    pub fn is_notification(&self) -> bool {
        !matches!(
            self,
            EventKind::Chat | EventKind::ViewerCount | EventKind::StreamStatus
        )
    }

    /// Kinds that carry no user identity (stream telemetry).
    pub fn is_anonymous(&self) -> bool {
        matches!(self, EventKind::ViewerCount | EventKind::StreamStatus)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform user id, always a non-empty string after normalization.
///
/// Platforms disagree on whether ids are strings or numbers; deserialization
/// accepts both and coerces numbers to their decimal representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(UserId(s.trim().to_string())),
            serde_json::Value::Number(n) => Ok(UserId(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "userId must be a string or number, got {other}"
            ))),
        }
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an adapter reports combo counts for a gift stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountSemantics {
    /// The platform emits running totals; aggregate by max.
    Monotonic,
    /// The platform emits per-event deltas; aggregate by sum.
    Delta,
}

/// Monetization payload shared by gift-like kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftData {
    pub gift_type: String,
    pub gift_count: u64,
    pub amount: f64,
    pub currency: String,
    /// Combo group this gift belongs to, if the platform streams repeats.
    pub group_id: Option<String>,
    /// True on the final event of a combo streak.
    pub repeat_end: bool,
    pub count_semantics: CountSemantics,
    /// Synthetic record emitted for observability; flows through without
    /// aggregating.
    pub is_error: bool,
}

/// Type-specific payload of a validated envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    Chat { text: String },
    Follow,
    Gift(GiftData),
    Paypiggy(GiftData),
    GiftPaypiggy(GiftData),
    EnvelopeGift(GiftData),
    Raid { viewers: u64 },
    Share,
    Cheer(GiftData),
    Redemption { reward: String, cost: u64 },
    ViewerCount { count: u64 },
    StreamStatus { live: bool },
}

impl EventData {
    /// Monetization payload, if this event carries one.
    pub fn gift(&self) -> Option<&GiftData> {
        match self {
            EventData::Gift(g)
            | EventData::Paypiggy(g)
            | EventData::GiftPaypiggy(g)
            | EventData::EnvelopeGift(g)
            | EventData::Cheer(g) => Some(g),
            _ => None,
        }
    }
}

/// The validated event carried on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub platform: Platform,
    pub kind: EventKind,
    /// Platform-unique id; present for all monetized events (dedup key).
    pub id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub user_id: UserId,
    pub data: EventData,
    pub correlation_id: Option<String>,
}

impl EventEnvelope {
    /// Dedup key `(platform, id)` for monetized events.
    pub fn dedup_key(&self) -> Option<(Platform, &str)> {
        match &self.id {
            Some(id) if self.kind.is_monetized() => Some((self.platform, id.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse_lowercases() {
        assert_eq!(Platform::parse("TikTok").unwrap(), Platform::Tiktok);
        assert_eq!(Platform::parse(" TWITCH ").unwrap(), Platform::Twitch);
        assert!(matches!(
            Platform::parse("kick"),
            Err(ValidationError::UnknownPlatform(_))
        ));
    }

    #[test]
    fn test_kind_round_trips_through_name() {
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
            assert_eq!(EventKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn test_paid_alias_is_rejected_with_message() {
        let err = EventKind::parse("subscription").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported paid alias event type: subscription"
        );
    }

    #[test]
    fn test_monetized_kinds() {
        assert!(EventKind::Gift.is_monetized());
        assert!(EventKind::Cheer.is_monetized());
        assert!(EventKind::EnvelopeGift.is_monetized());
        assert!(!EventKind::Follow.is_monetized());
        assert!(!EventKind::Chat.is_monetized());
    }

    #[test]
    fn test_notification_kinds_exclude_lightweight() {
        assert!(EventKind::Follow.is_notification());
        assert!(EventKind::Raid.is_notification());
        assert!(!EventKind::Chat.is_notification());
        assert!(!EventKind::ViewerCount.is_notification());
        assert!(!EventKind::StreamStatus.is_notification());
    }

    #[test]
    fn test_user_id_accepts_number_and_string() {
        let from_number: UserId = serde_json::from_str("7001").unwrap();
        assert_eq!(from_number.as_str(), "7001");

        let from_string: UserId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(from_string.as_str(), "abc");

        let zero: UserId = serde_json::from_str("0").unwrap();
        assert_eq!(zero.as_str(), "0");
        assert!(!zero.is_empty());
    }

    #[test]
    fn test_user_id_rejects_other_json_types() {
        assert!(serde_json::from_str::<UserId>("true").is_err());
        assert!(serde_json::from_str::<UserId>("[1]").is_err());
    }

    #[test]
    fn test_dedup_key_requires_monetized_id() {
        let gift = GiftData {
            gift_type: "Rose".to_string(),
            gift_count: 1,
            amount: 1.0,
            currency: "USD".to_string(),
            group_id: None,
            repeat_end: true,
            count_semantics: CountSemantics::Delta,
            is_error: false,
        };
        let envelope = EventEnvelope {
            platform: Platform::Tiktok,
            kind: EventKind::Gift,
            id: Some("g-1".to_string()),
            timestamp: chrono::Utc::now(),
            username: "viewer".to_string(),
            user_id: UserId::new("42"),
            data: EventData::Gift(gift),
            correlation_id: None,
        };

        assert_eq!(envelope.dedup_key(), Some((Platform::Tiktok, "g-1")));

        let follow = EventEnvelope {
            kind: EventKind::Follow,
            id: Some("f-1".to_string()),
            data: EventData::Follow,
            ..envelope
        };
        assert_eq!(follow.dedup_key(), None);
    }
}
