//! Notification message builder.
//!
//! Renders the three texts of an artifact from a validated envelope:
//! the concise on-screen line, the spoken form (amounts expanded to words,
//! URLs and filtered tokens replaced), and the structured audit line.

use crate::envelope::{EventData, EventEnvelope, GiftData};

use super::artifact::ArtifactKind;
use super::sanitize::sanitize_text;

/// The three text renderings of one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltMessages {
    pub display: String,
    pub tts: String,
    pub log: String,
}

/// Render messages for `envelope`.
///
/// `first_message` upgrades a chat line to a greeting. Strings are already
/// expected to be sanitized by the caller (`username`, chat text); amounts
/// and counts are formatted here.
pub fn build_messages(
    envelope: &EventEnvelope,
    username: &str,
    first_message: bool,
    max_chars: usize,
) -> (ArtifactKind, BuiltMessages) {
    let platform = envelope.platform;

    let (kind, display, tts) = match &envelope.data {
        EventData::Chat { text } => {
            let text = sanitize_text(text, max_chars);
            if first_message {
                (
                    ArtifactKind::Greeting,
                    format!("Welcome, {username}!"),
                    format!("{username} says hello for the first time"),
                )
            } else {
                (
                    ArtifactKind::Chat,
                    format!("{username}: {text}"),
                    format!("{username} says {text}"),
                )
            }
        }
        EventData::Follow => (
            ArtifactKind::Follow,
            format!("{username} followed!"),
            format!("{username} just followed the stream"),
        ),
        EventData::Gift(gift) => (
            ArtifactKind::Gift,
            format!(
                "{username} sent {}x {} ({} {})",
                gift.gift_count,
                gift.gift_type,
                format_amount(gift.amount),
                gift.currency
            ),
            format!(
                "{username} sent {} {}, worth {}",
                gift.gift_count,
                gift.gift_type,
                spoken_amount(gift)
            ),
        ),
        EventData::Paypiggy(gift) => (
            ArtifactKind::Member,
            format!("{username} became a member ({})", gift.gift_type),
            format!("{username} just became a member"),
        ),
        EventData::GiftPaypiggy(gift) => (
            ArtifactKind::GiftMembership,
            format!(
                "{username} gifted {} memberships ({} {})",
                gift.gift_count,
                format_amount(gift.amount),
                gift.currency
            ),
            format!(
                "{username} gifted {} memberships, worth {}",
                gift.gift_count,
                spoken_amount(gift)
            ),
        ),
        EventData::EnvelopeGift(gift) => (
            ArtifactKind::Envelope,
            format!(
                "{username} sent {} ({} {})",
                gift.gift_type,
                format_amount(gift.amount),
                gift.currency
            ),
            format!(
                "{username} sent a {}, worth {}",
                gift.gift_type,
                spoken_amount(gift)
            ),
        ),
        EventData::Cheer(gift) => (
            ArtifactKind::Cheer,
            format!(
                "{username} cheered {}x {} ({} {})",
                gift.gift_count,
                gift.gift_type,
                format_amount(gift.amount),
                gift.currency
            ),
            format!(
                "{username} cheered {} {}, worth {}",
                gift.gift_count,
                gift.gift_type,
                spoken_amount(gift)
            ),
        ),
        EventData::Raid { viewers } => (
            ArtifactKind::Raid,
            format!("{username} raided with {viewers} viewers!"),
            format!("{username} is raiding with {viewers} viewers"),
        ),
        EventData::Share => (
            ArtifactKind::Share,
            format!("{username} shared the stream!"),
            format!("{username} just shared the stream"),
        ),
        EventData::Redemption { reward, .. } => {
            let reward = sanitize_text(reward, max_chars);
            (
                ArtifactKind::Redemption,
                format!("{username} redeemed {reward}"),
                format!("{username} redeemed {reward}"),
            )
        }
        // Lightweight kinds never reach the builder; render a neutral line
        // instead of panicking if one slips through.
        EventData::ViewerCount { .. } | EventData::StreamStatus { .. } => (
            ArtifactKind::Chat,
            String::new(),
            String::new(),
        ),
    };

    let log = build_log_line(envelope, kind, username);

    (
        kind,
        BuiltMessages {
            display: sanitize_text(&display, max_chars),
            tts,
            log,
        },
    )
}

/// Structured audit line for the log file.
fn build_log_line(envelope: &EventEnvelope, kind: ArtifactKind, username: &str) -> String {
    let mut line = format!(
        "platform={} kind={} user={} user_id={}",
        envelope.platform,
        kind,
        username,
        envelope.user_id
    );
    if let Some(id) = &envelope.id {
        line.push_str(&format!(" id={id}"));
    }
    if let Some(gift) = envelope.data.gift() {
        line.push_str(&format!(
            " gift_type={} count={} amount={} currency={}",
            gift.gift_type,
            gift.gift_count,
            format_amount(gift.amount),
            gift.currency
        ));
    }
    line
}

/// Compact numeric form: two decimals, trailing ".00" dropped.
pub fn format_amount(amount: f64) -> String {
    let formatted = format!("{amount:.2}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Spoken amount: "5 US dollars", "1 euro", "500 coins".
pub fn spoken_amount(gift: &GiftData) -> String {
    let amount = format_amount(gift.amount);
    let singular = (gift.amount - 1.0).abs() < f64::EPSILON;
    let unit = match gift.currency.to_uppercase().as_str() {
        "USD" => {
            if singular {
                "US dollar"
            } else {
                "US dollars"
            }
        }
        "EUR" => {
            if singular {
                "euro"
            } else {
                "euros"
            }
        }
        "GBP" => {
            if singular {
                "British pound"
            } else {
                "British pounds"
            }
        }
        "JPY" => "yen",
        "COINS" | "COIN" => "coins",
        "BITS" | "BIT" => "bits",
        "DIAMONDS" | "DIAMOND" => "diamonds",
        other => return format!("{amount} {other}"),
    };
    format!("{amount} {unit}")
}
