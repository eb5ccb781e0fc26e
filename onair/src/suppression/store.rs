//! The suppression & dedup store.
//!
//! One store instance is owned by the router task and mutated only from its
//! dispatch path. Memory is bounded: the dedup index evicts oldest-first
//! past `max_entries`, and the periodic sweep trims expired dedup entries,
//! lapsed suppressions and stale user states.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::debug;

use super::combo::ComboTracker;
use crate::envelope::{EventData, EventEnvelope, EventKind, Platform};

/// Store tuning, derived from `[general]` settings.
#[derive(Debug, Clone)]
pub struct SuppressionConfig {
    pub dedup_ttl: Duration,
    /// Per-user rate limiting; off by default.
    pub suppression_enabled: bool,
    pub max_notifications_per_user: u32,
    pub suppression_window: Duration,
    pub suppression_duration: Duration,
    pub combo_timeout: Duration,
    pub max_entries: usize,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            dedup_ttl: Duration::from_millis(crate::config::DEFAULT_DEDUP_TTL_MS),
            suppression_enabled: false,
            max_notifications_per_user: crate::config::DEFAULT_MAX_NOTIFICATIONS_PER_USER,
            suppression_window: Duration::from_millis(crate::config::DEFAULT_SUPPRESSION_WINDOW_MS),
            suppression_duration: Duration::from_millis(
                crate::config::DEFAULT_SUPPRESSION_DURATION_MS,
            ),
            combo_timeout: Duration::from_millis(crate::config::DEFAULT_COMBO_TIMEOUT_MS),
            max_entries: crate::config::DEFAULT_STORE_MAX_ENTRIES,
        }
    }
}

/// Decision for one notification-bearing envelope.
#[derive(Debug)]
pub enum Admission {
    /// Pass to the notification manager (possibly an aggregate).
    Forward(EventEnvelope),
    /// Part of an open combo group; held until the group settles.
    Accumulated,
    /// Dedup hit inside the TTL.
    Duplicate,
    /// User is rate-limited.
    Suppressed,
}

#[derive(Debug, Default)]
struct UserState {
    last_seen: Option<Instant>,
    notification_count: u64,
    suppressed_until: Option<Instant>,
    /// Rate-limit windows per event kind.
    windows: HashMap<EventKind, (Instant, u32)>,
}

/// Suppression, dedup and combo state for the whole pipeline.
pub struct SuppressionStore {
    config: SuppressionConfig,
    /// Dedup index: `(platform, id)` → insertion time.
    dedup: HashMap<(Platform, String), Instant>,
    /// Insertion order for oldest-first eviction.
    dedup_order: VecDeque<(Platform, String)>,
    users: HashMap<(Platform, String), UserState>,
    combos: ComboTracker,
}

impl SuppressionStore {
    pub fn new(config: SuppressionConfig) -> Self {
        Self {
            config,
            dedup: HashMap::new(),
            dedup_order: VecDeque::new(),
            users: HashMap::new(),
            combos: ComboTracker::new(),
        }
    }

    /// Admit one notification-bearing envelope.
    ///
    /// Order of checks: dedup, then user rate limit, then combo grouping.
    pub fn admit(&mut self, envelope: EventEnvelope, now: Instant) -> Admission {
        if let Some((platform, id)) = envelope.dedup_key() {
            if self.is_duplicate(platform, id, now) {
                debug!(platform = %platform, id, "duplicate event dropped");
                return Admission::Duplicate;
            }
            self.record_id(platform, id.to_string(), now);
        }

        if self.config.suppression_enabled && !envelope.kind.is_anonymous() {
            if self.check_rate_limit(&envelope, now) {
                return Admission::Suppressed;
            }
        }

        // Only plain gifts aggregate; envelope gifts are one-shot by design.
        if envelope.kind == EventKind::Gift {
            if let EventData::Gift(gift) = &envelope.data {
                if !gift.is_error {
                    if let Some(group_id) = gift.group_id.clone() {
                        return match self.combos.accumulate(&group_id, envelope, now) {
                            Some(settlement) => Admission::Forward(settlement.envelope),
                            None => Admission::Accumulated,
                        };
                    }
                }
            }
        }

        Admission::Forward(envelope)
    }

    /// Settle idle combo groups and trim expired state.
    ///
    /// Returns aggregated envelopes to forward, oldest group first.
    pub fn sweep(&mut self, now: Instant) -> Vec<EventEnvelope> {
        let settled: Vec<EventEnvelope> = self
            .combos
            .settle_idle(self.config.combo_timeout, now)
            .into_iter()
            .map(|s| s.envelope)
            .collect();

        self.trim_dedup(now);
        self.trim_users(now);

        settled
    }

    /// Number of live dedup entries (test hook).
    pub fn dedup_len(&self) -> usize {
        self.dedup.len()
    }

    /// Number of open combo groups (test hook).
    pub fn open_combo_groups(&self) -> usize {
        self.combos.open_groups()
    }

    fn is_duplicate(&self, platform: Platform, id: &str, now: Instant) -> bool {
        match self.dedup.get(&(platform, id.to_string())) {
            Some(inserted) => now.duration_since(*inserted) < self.config.dedup_ttl,
            None => false,
        }
    }

    fn record_id(&mut self, platform: Platform, id: String, now: Instant) {
        let key = (platform, id);
        if self.dedup.insert(key.clone(), now).is_none() {
            self.dedup_order.push_back(key);
        }

        // Bounded memory: evict oldest entries past the cap.
        while self.dedup.len() > self.config.max_entries {
            match self.dedup_order.pop_front() {
                Some(oldest) => {
                    self.dedup.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// True when the user is (now) suppressed and the event must drop.
    fn check_rate_limit(&mut self, envelope: &EventEnvelope, now: Instant) -> bool {
        let key = (envelope.platform, envelope.user_id.as_str().to_string());
        let state = self.users.entry(key).or_default();
        state.last_seen = Some(now);
        state.notification_count += 1;

        if let Some(until) = state.suppressed_until {
            if now < until {
                return true;
            }
            state.suppressed_until = None;
        }

        let window = self.config.suppression_window;
        let (start, count) = state
            .windows
            .entry(envelope.kind)
            .or_insert((now, 0));

        if now.duration_since(*start) >= window {
            *start = now;
            *count = 0;
        }
        *count += 1;

        if *count > self.config.max_notifications_per_user {
            state.suppressed_until = Some(now + self.config.suppression_duration);
            debug!(
                platform = %envelope.platform,
                user_id = %envelope.user_id,
                kind = %envelope.kind,
                "user rate-limited; suppressing"
            );
            return true;
        }
        false
    }

    fn trim_dedup(&mut self, now: Instant) {
        while let Some((key, _)) = self
            .dedup_order
            .front()
            .and_then(|key| self.dedup.get(key).map(|at| (key.clone(), *at)))
            .filter(|(_, at)| now.duration_since(*at) >= self.config.dedup_ttl)
        {
            self.dedup_order.pop_front();
            self.dedup.remove(&key);
        }
    }

    fn trim_users(&mut self, now: Instant) {
        let stale_after = self.config.suppression_window.max(self.config.suppression_duration);
        self.users.retain(|_, state| {
            if let Some(until) = state.suppressed_until {
                if now >= until {
                    state.suppressed_until = None;
                }
            }
            match state.last_seen {
                Some(seen) => now.duration_since(seen) < stale_after,
                None => false,
            }
        });
    }
}
