//! Per-user tracking.
//!
//! Remembers which users have chatted before so the pipeline can greet
//! first-time chatters, and keeps lightweight per-user counters for the
//! session. State is in-memory only and resets with the process.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::envelope::Platform;

/// Session record for one user.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub first_seen: DateTime<Utc>,
    pub message_count: u64,
    pub notification_count: u64,
}

/// Tracks users across the session, keyed by `(platform, user id)`.
#[derive(Debug, Default)]
pub struct UserTracker {
    users: HashMap<(Platform, String), UserRecord>,
}

impl UserTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chat message; returns true when it is the user's first.
    pub fn record_message(&mut self, platform: Platform, user_id: &str) -> bool {
        let record = self
            .users
            .entry((platform, user_id.to_string()))
            .or_insert_with(|| UserRecord {
                first_seen: Utc::now(),
                message_count: 0,
                notification_count: 0,
            });
        record.message_count += 1;
        record.message_count == 1
    }

    /// Record a notification-bearing event for the user.
    pub fn record_notification(&mut self, platform: Platform, user_id: &str) {
        let record = self
            .users
            .entry((platform, user_id.to_string()))
            .or_insert_with(|| UserRecord {
                first_seen: Utc::now(),
                message_count: 0,
                notification_count: 0,
            });
        record.notification_count += 1;
    }

    /// Session record for one user, if seen.
    pub fn get(&self, platform: Platform, user_id: &str) -> Option<&UserRecord> {
        self.users.get(&(platform, user_id.to_string()))
    }

    /// Number of distinct users seen this session.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_flag() {
        let mut tracker = UserTracker::new();
        assert!(tracker.record_message(Platform::Twitch, "u1"));
        assert!(!tracker.record_message(Platform::Twitch, "u1"));
        // Same id on another platform is a different user.
        assert!(tracker.record_message(Platform::Tiktok, "u1"));
    }

    #[test]
    fn test_notification_counter() {
        let mut tracker = UserTracker::new();
        tracker.record_notification(Platform::Twitch, "u1");
        tracker.record_notification(Platform::Twitch, "u1");

        let record = tracker.get(Platform::Twitch, "u1").unwrap();
        assert_eq!(record.notification_count, 2);
        assert_eq!(record.message_count, 0);
    }

    #[test]
    fn test_distinct_user_count() {
        let mut tracker = UserTracker::new();
        tracker.record_message(Platform::Twitch, "u1");
        tracker.record_message(Platform::Twitch, "u2");
        tracker.record_notification(Platform::Tiktok, "u1");
        assert_eq!(tracker.len(), 3);
    }
}
