//! Envelope validation.
//!
//! Converts a loose [`EventRecord`] into a typed [`EventEnvelope`],
//! enforcing the canonical rules: known platform and kind, monetization
//! fields present with sane minimums, non-empty chat text, finite viewer
//! counts, and userId normalized to a non-empty string. Failures are typed
//! rejections; nothing here panics on bad input.

use thiserror::Error;

use super::record::EventRecord;
use super::types::{
    CountSemantics, EventData, EventEnvelope, EventKind, GiftData, Platform, UserId,
};

/// Typed rejection produced by envelope validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown event type: {0}")]
    UnknownKind(String),

    #[error("Unsupported paid alias event type: {0}")]
    UnsupportedPaidAlias(String),

    #[error("Missing event id for monetized type {0}")]
    MissingId(String),

    #[error("Missing timestamp")]
    MissingTimestamp,

    #[error("Missing or empty username")]
    MissingUsername,

    #[error("Missing or empty userId")]
    InvalidUserId,

    #[error("Missing or empty gift type")]
    MissingGiftType,

    #[error("Invalid gift count: {0}")]
    InvalidGiftCount(i64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Missing or empty currency")]
    MissingCurrency,

    #[error("Missing or empty chat message")]
    MissingChatMessage,

    #[error("Viewer count must be a finite number")]
    InvalidViewerCount,
}

impl EventEnvelope {
    /// Validate a record and build the typed envelope.
    pub fn try_from_record(record: &EventRecord) -> Result<Self, ValidationError> {
        let platform = Platform::parse(&record.platform)?;
        let kind = EventKind::parse(&record.kind)?;

        let timestamp = record.timestamp.ok_or(ValidationError::MissingTimestamp)?;

        let (username, user_id) = if kind.is_anonymous() {
            // Stream telemetry carries no user identity.
            (String::new(), UserId::new(""))
        } else {
            let username = record
                .username
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .ok_or(ValidationError::MissingUsername)?
                .to_string();
            (username, normalize_user_id(record.user_id.as_ref())?)
        };

        let data = build_data(kind, record)?;

        let id = match record.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => None,
        };

        if kind.is_monetized() && id.is_none() {
            // Synthetic error records may omit the id.
            let is_error = data.gift().map(|g| g.is_error).unwrap_or(false);
            if !is_error {
                return Err(ValidationError::MissingId(kind.as_str().to_string()));
            }
        }

        Ok(EventEnvelope {
            platform,
            kind,
            id,
            timestamp,
            username,
            user_id,
            data,
            correlation_id: record.correlation_id.clone(),
        })
    }
}

/// Coerce `userId` to its string form: strings are trimmed, numbers take
/// their decimal representation. Empty results are rejections.
fn normalize_user_id(value: Option<&serde_json::Value>) -> Result<UserId, ValidationError> {
    let id = match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(ValidationError::InvalidUserId),
    };

    if id.is_empty() {
        return Err(ValidationError::InvalidUserId);
    }
    Ok(UserId::new(id))
}

fn build_data(kind: EventKind, record: &EventRecord) -> Result<EventData, ValidationError> {
    let data = &record.data;

    match kind {
        EventKind::Chat => {
            let text = data
                .text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(ValidationError::MissingChatMessage)?;
            Ok(EventData::Chat {
                text: text.to_string(),
            })
        }
        EventKind::Follow => Ok(EventData::Follow),
        EventKind::Share => Ok(EventData::Share),
        EventKind::Raid => Ok(EventData::Raid {
            viewers: data.viewers.unwrap_or(0),
        }),
        EventKind::Redemption => Ok(EventData::Redemption {
            reward: data.reward.clone().unwrap_or_default(),
            cost: data.cost.unwrap_or(0),
        }),
        EventKind::ViewerCount => {
            let count = data.count.ok_or(ValidationError::InvalidViewerCount)?;
            if !count.is_finite() || count < 0.0 {
                return Err(ValidationError::InvalidViewerCount);
            }
            Ok(EventData::ViewerCount {
                count: count as u64,
            })
        }
        EventKind::StreamStatus => Ok(EventData::StreamStatus {
            live: data.live.unwrap_or(false),
        }),
        EventKind::Gift
        | EventKind::Paypiggy
        | EventKind::GiftPaypiggy
        | EventKind::EnvelopeGift
        | EventKind::Cheer => {
            let gift = validate_gift(record)?;
            Ok(match kind {
                EventKind::Gift => EventData::Gift(gift),
                EventKind::Paypiggy => EventData::Paypiggy(gift),
                EventKind::GiftPaypiggy => EventData::GiftPaypiggy(gift),
                EventKind::EnvelopeGift => EventData::EnvelopeGift(gift),
                EventKind::Cheer => EventData::Cheer(gift),
                _ => unreachable!(),
            })
        }
    }
}

/// Monetization rules: gift type and currency non-empty after trim, count
/// at least 1 and amount non-negative. `isError` records relax the count
/// minimum to 0 (the id requirement is relaxed by the caller).
fn validate_gift(record: &EventRecord) -> Result<GiftData, ValidationError> {
    let data = &record.data;
    let is_error = data.is_error.unwrap_or(false);

    let gift_type = data
        .gift_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ValidationError::MissingGiftType)?
        .to_string();

    let currency = data
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(ValidationError::MissingCurrency)?
        .to_string();

    let raw_count = data.gift_count.unwrap_or(-1);
    let min_count = if is_error { 0 } else { 1 };
    if raw_count < min_count {
        return Err(ValidationError::InvalidGiftCount(raw_count));
    }

    let amount = data.amount.unwrap_or(-1.0);
    if !amount.is_finite() || amount < 0.0 {
        return Err(ValidationError::InvalidAmount(amount));
    }

    Ok(GiftData {
        gift_type,
        gift_count: raw_count as u64,
        amount,
        currency,
        group_id: data
            .group_id
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string),
        repeat_end: data.repeat_end.unwrap_or(true),
        count_semantics: if data.monotonic.unwrap_or(false) {
            CountSemantics::Monotonic
        } else {
            CountSemantics::Delta
        },
        is_error,
    })
}
