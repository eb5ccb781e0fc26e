//! Notification artifacts.
//!
//! An artifact is the user-facing product of one admitted event: the three
//! text renderings plus scheduling metadata for the display queue.

use chrono::{DateTime, Utc};

use crate::envelope::Platform;

use super::vfx::VfxConfig;

/// Overlay slot an artifact targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Rolling chat line, last writer wins.
    Chat,
    /// Exclusive notification banner, at most one active.
    Notification,
}

/// What an artifact announces. Finer-grained than the envelope kind:
/// a first-time chatter produces a `Greeting`, paid memberships render as
/// `Member`, and runtime-generated command responses are `Command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Chat,
    Greeting,
    Follow,
    Member,
    Gift,
    Command,
    Redemption,
    Share,
    Raid,
    Envelope,
    Cheer,
    GiftMembership,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Chat => "chat",
            ArtifactKind::Greeting => "greeting",
            ArtifactKind::Follow => "follow",
            ArtifactKind::Member => "member",
            ArtifactKind::Gift => "gift",
            ArtifactKind::Command => "command",
            ArtifactKind::Redemption => "redemption",
            ArtifactKind::Share => "share",
            ArtifactKind::Raid => "raid",
            ArtifactKind::Envelope => "envelope",
            ArtifactKind::Cheer => "cheer",
            ArtifactKind::GiftMembership => "giftmembership",
        }
    }

    /// Slot this kind renders into.
    pub fn slot(&self) -> Slot {
        match self {
            ArtifactKind::Chat => Slot::Chat,
            _ => Slot::Notification,
        }
    }

    /// True for kinds announcing money.
    pub fn is_monetized(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Gift
                | ArtifactKind::Member
                | ArtifactKind::Envelope
                | ArtifactKind::Cheer
                | ArtifactKind::GiftMembership
        )
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user-facing product of one admitted event.
#[derive(Debug, Clone)]
pub struct NotificationArtifact {
    /// Stable id, derived from the envelope when it carries one.
    pub id: String,
    pub kind: ArtifactKind,
    pub platform: Platform,
    pub username: String,
    /// Concise on-screen text.
    pub display_message: String,
    /// Spoken form with amounts expanded and emoji/URLs filtered.
    pub tts_message: String,
    /// Structured audit line.
    pub log_message: String,
    pub priority: u8,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
    /// Visual effect attached by the VFX catalog, if one matched.
    pub vfx: Option<VfxConfig>,
}

impl NotificationArtifact {
    pub fn slot(&self) -> Slot {
        self.kind.slot()
    }
}
