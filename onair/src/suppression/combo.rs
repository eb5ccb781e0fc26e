//! Combo-gift aggregation.
//!
//! Platforms that stream gift repeats emit one event per step of a streak,
//! all sharing a `group_id`. The tracker holds each open group and settles
//! it exactly once: either when the final event arrives (`repeat_end`) or
//! when the group has been idle past the combo timeout. The aggregate count
//! is the maximum observed count for monotonic platforms and the sum of
//! deltas otherwise; the adapter declares which via the envelope.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::envelope::{CountSemantics, EventData, EventEnvelope};

/// A settled combo group, ready to forward as one aggregated gift.
#[derive(Debug)]
pub struct ComboSettlement {
    pub group_id: String,
    pub envelope: EventEnvelope,
}

struct ComboGroup {
    /// Latest contributing envelope; the aggregate is built from it.
    template: EventEnvelope,
    semantics: CountSemantics,
    cumulative: u64,
    first_seen: Instant,
    last_updated: Instant,
}

impl ComboGroup {
    fn aggregate(self, group_id: String) -> ComboSettlement {
        let mut envelope = self.template;
        if let EventData::Gift(gift) = &mut envelope.data {
            gift.gift_count = self.cumulative;
            gift.repeat_end = true;
        }
        ComboSettlement { group_id, envelope }
    }
}

/// Tracks open combo groups keyed by group id.
#[derive(Default)]
pub struct ComboTracker {
    groups: HashMap<String, ComboGroup>,
}

impl ComboTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open groups.
    pub fn open_groups(&self) -> usize {
        self.groups.len()
    }

    /// Fold a gift event into its group.
    ///
    /// Returns the settlement when this event closes the group
    /// (`repeat_end`), `None` while the group stays open.
    pub fn accumulate(
        &mut self,
        group_id: &str,
        envelope: EventEnvelope,
        now: Instant,
    ) -> Option<ComboSettlement> {
        let (count, semantics, repeat_end) = match &envelope.data {
            EventData::Gift(gift) => (gift.gift_count, gift.count_semantics, gift.repeat_end),
            _ => return None,
        };

        let group = self
            .groups
            .entry(group_id.to_string())
            .or_insert_with(|| ComboGroup {
                template: envelope.clone(),
                semantics,
                cumulative: 0,
                first_seen: now,
                last_updated: now,
            });

        group.cumulative = match group.semantics {
            CountSemantics::Monotonic => group.cumulative.max(count),
            CountSemantics::Delta => group.cumulative.saturating_add(count),
        };
        group.template = envelope;
        group.last_updated = now;

        if repeat_end {
            let group = self.groups.remove(group_id).expect("group just inserted");
            return Some(group.aggregate(group_id.to_string()));
        }
        None
    }

    /// Settle every group idle for at least `timeout`.
    ///
    /// Reorders across time but never across distinct group ids.
    pub fn settle_idle(&mut self, timeout: Duration, now: Instant) -> Vec<ComboSettlement> {
        let expired: Vec<String> = self
            .groups
            .iter()
            .filter(|(_, group)| now.duration_since(group.last_updated) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();

        let mut settlements: Vec<(Instant, ComboSettlement)> = expired
            .into_iter()
            .filter_map(|id| {
                self.groups
                    .remove(&id)
                    .map(|group| (group.first_seen, group.aggregate(id)))
            })
            .collect();

        // Oldest group settles first to keep delivery order stable.
        settlements.sort_by_key(|(first_seen, _)| *first_seen);
        settlements.into_iter().map(|(_, s)| s).collect()
    }
}
