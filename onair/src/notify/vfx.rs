//! Visual effect catalog.
//!
//! Maps artifact kind, gift type and amount tier to an overlay effect
//! config. The catalog is data; rendering belongs to the overlay.

use super::artifact::ArtifactKind;
use crate::envelope::GiftData;

/// Effect configuration attached to an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct VfxConfig {
    /// Overlay effect name (a source or filter the overlay knows).
    pub effect: String,
    pub duration_ms: u64,
}

/// One matching rule.
#[derive(Debug, Clone)]
pub struct VfxRule {
    pub kind: ArtifactKind,
    /// Minimum amount for the rule to fire (0.0 matches everything).
    pub min_amount: f64,
    /// Restrict to one gift type, if set.
    pub gift_type: Option<String>,
    pub effect: String,
    pub duration_ms: u64,
}

/// Ordered rule list; the first match wins, so list specific rules first.
#[derive(Debug, Clone, Default)]
pub struct VfxCatalog {
    rules: Vec<VfxRule>,
}

impl VfxCatalog {
    pub fn new(rules: Vec<VfxRule>) -> Self {
        Self { rules }
    }

    /// A small built-in catalog for overlays without custom rules.
    pub fn built_in() -> Self {
        Self::new(vec![
            VfxRule {
                kind: ArtifactKind::Envelope,
                min_amount: 0.0,
                gift_type: None,
                effect: "confetti_burst".to_string(),
                duration_ms: 4_000,
            },
            VfxRule {
                kind: ArtifactKind::GiftMembership,
                min_amount: 0.0,
                gift_type: None,
                effect: "gold_rain".to_string(),
                duration_ms: 5_000,
            },
            VfxRule {
                kind: ArtifactKind::Gift,
                min_amount: 50.0,
                gift_type: None,
                effect: "firework".to_string(),
                duration_ms: 4_000,
            },
            VfxRule {
                kind: ArtifactKind::Raid,
                min_amount: 0.0,
                gift_type: None,
                effect: "raid_banner".to_string(),
                duration_ms: 3_000,
            },
        ])
    }

    /// Find the effect for an artifact, if any rule matches.
    pub fn match_effect(&self, kind: ArtifactKind, gift: Option<&GiftData>) -> Option<VfxConfig> {
        let amount = gift.map(|g| g.amount).unwrap_or(0.0);
        let gift_type = gift.map(|g| g.gift_type.as_str());

        self.rules
            .iter()
            .find(|rule| {
                rule.kind == kind
                    && amount >= rule.min_amount
                    && rule
                        .gift_type
                        .as_deref()
                        .map(|wanted| Some(wanted) == gift_type)
                        .unwrap_or(true)
            })
            .map(|rule| VfxConfig {
                effect: rule.effect.clone(),
                duration_ms: rule.duration_ms,
            })
    }
}
