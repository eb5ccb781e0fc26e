//! Wire/log form of the envelope.
//!
//! `EventRecord` is what adapters hand to the router and what the audit log
//! stores. It is deliberately loose: every payload field is optional and
//! `userId` may be a string or a number. Validation tightens it into an
//! [`EventEnvelope`](super::EventEnvelope); a record that round-trips through
//! JSON and re-validation produces an identical envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{EventData, EventEnvelope, GiftData};

/// Loose payload carried by a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Combo group id for repeat gift streaks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_end: Option<bool>,
    /// True when the platform reports running totals rather than deltas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monotonic: Option<bool>,
    /// Synthetic observability record; relaxes monetization minimums.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    /// Viewer-count payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<f64>,
    /// Stream-status payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<bool>,
    /// Raid payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewers: Option<u64>,
    /// Redemption payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,
}

/// The record adapters emit and the audit log stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub platform: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// String or number on the wire; coerced to string by validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub data: RecordData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl EventRecord {
    /// Build the loggable record form of a validated envelope.
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        let mut data = RecordData::default();

        match &envelope.data {
            EventData::Chat { text } => data.text = Some(text.clone()),
            EventData::Follow | EventData::Share => {}
            EventData::Gift(g)
            | EventData::Paypiggy(g)
            | EventData::GiftPaypiggy(g)
            | EventData::EnvelopeGift(g)
            | EventData::Cheer(g) => fill_gift(&mut data, g),
            EventData::Raid { viewers } => data.viewers = Some(*viewers),
            EventData::Redemption { reward, cost } => {
                data.reward = Some(reward.clone());
                data.cost = Some(*cost);
            }
            EventData::ViewerCount { count } => data.count = Some(*count as f64),
            EventData::StreamStatus { live } => data.live = Some(*live),
        }

        EventRecord {
            platform: envelope.platform.as_str().to_string(),
            kind: envelope.kind.as_str().to_string(),
            id: envelope.id.clone(),
            timestamp: Some(envelope.timestamp),
            username: if envelope.username.is_empty() {
                None
            } else {
                Some(envelope.username.clone())
            },
            user_id: if envelope.user_id.is_empty() {
                None
            } else {
                Some(serde_json::Value::String(
                    envelope.user_id.as_str().to_string(),
                ))
            },
            data,
            correlation_id: envelope.correlation_id.clone(),
        }
    }
}

fn fill_gift(data: &mut RecordData, gift: &GiftData) {
    data.gift_type = Some(gift.gift_type.clone());
    data.gift_count = Some(gift.gift_count as i64);
    data.amount = Some(gift.amount);
    data.currency = Some(gift.currency.clone());
    data.group_id = gift.group_id.clone();
    data.repeat_end = Some(gift.repeat_end);
    data.monotonic = Some(matches!(
        gift.count_semantics,
        super::types::CountSemantics::Monotonic
    ));
    if gift.is_error {
        data.is_error = Some(true);
    }
}
