//! Notification priority table.
//!
//! Higher wins when competing for the notification slot; ties break by
//! enqueue order in the display queue.

use super::artifact::ArtifactKind;

/// Priority for an artifact kind.
pub fn priority_for(kind: ArtifactKind) -> u8 {
    match kind {
        ArtifactKind::Chat => 1,
        ArtifactKind::Follow => 2,
        ArtifactKind::Greeting => 2,
        ArtifactKind::Member => 3,
        ArtifactKind::Gift => 4,
        ArtifactKind::Command => 4,
        ArtifactKind::Redemption => 4,
        ArtifactKind::Share => 6,
        ArtifactKind::Raid => 6,
        ArtifactKind::Envelope => 8,
        ArtifactKind::Cheer => 10,
        ArtifactKind::GiftMembership => 11,
    }
}
