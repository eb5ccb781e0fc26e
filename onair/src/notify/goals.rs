//! Donation goal tracking.
//!
//! Accumulates monetization totals per currency so the overlay can render
//! goal progress. Failures here must never drop a notification; the manager
//! guards every call.

use std::collections::HashMap;

/// Snapshot of accumulated donation totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalSnapshot {
    /// Total per currency code.
    pub totals: HashMap<String, f64>,
    /// Number of contributing events.
    pub contribution_count: u64,
}

/// Accumulates donation totals per currency.
#[derive(Debug, Default)]
pub struct DonationGoals {
    totals: HashMap<String, f64>,
    contribution_count: u64,
}

impl DonationGoals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one contribution.
    ///
    /// Zero amounts still count as contributions (free gifts keep streak
    /// counters honest); negative amounts are ignored.
    pub fn record(&mut self, amount: f64, currency: &str) {
        if !amount.is_finite() || amount < 0.0 {
            return;
        }
        let code = currency.trim().to_uppercase();
        if code.is_empty() {
            return;
        }
        *self.totals.entry(code).or_insert(0.0) += amount;
        self.contribution_count += 1;
    }

    /// Current totals.
    pub fn snapshot(&self) -> GoalSnapshot {
        GoalSnapshot {
            totals: self.totals.clone(),
            contribution_count: self.contribution_count,
        }
    }

    /// Total for one currency, zero when unseen.
    pub fn total_for(&self, currency: &str) -> f64 {
        self.totals
            .get(&currency.trim().to_uppercase())
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate_per_currency() {
        let mut goals = DonationGoals::new();
        goals.record(5.0, "USD");
        goals.record(2.5, "usd");
        goals.record(10.0, "EUR");

        assert_eq!(goals.total_for("USD"), 7.5);
        assert_eq!(goals.total_for("EUR"), 10.0);
        assert_eq!(goals.snapshot().contribution_count, 3);
    }

    #[test]
    fn test_monotonic_totals_never_decrease() {
        let mut goals = DonationGoals::new();
        goals.record(5.0, "USD");
        let before = goals.total_for("USD");

        goals.record(-3.0, "USD");
        goals.record(f64::NAN, "USD");
        goals.record(0.0, "USD");

        assert!(goals.total_for("USD") >= before);
    }

    #[test]
    fn test_zero_amount_counts_contribution() {
        let mut goals = DonationGoals::new();
        goals.record(0.0, "COINS");
        assert_eq!(goals.snapshot().contribution_count, 1);
        assert_eq!(goals.total_for("COINS"), 0.0);
    }

    #[test]
    fn test_empty_currency_ignored() {
        let mut goals = DonationGoals::new();
        goals.record(5.0, "  ");
        assert_eq!(goals.snapshot().contribution_count, 0);
    }
}
