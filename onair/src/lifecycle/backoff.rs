//! Jittered exponential backoff for reconnect attempts.

use rand::Rng;
use std::time::Duration;

/// Backoff schedule configuration.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Upper bound for any delay.
    pub cap: Duration,
    /// Jitter as a fraction of the delay (0.25 = ±25%).
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            cap: Duration::from_secs(60),
            jitter: 0.25,
        }
    }
}

/// Exponential backoff with jitter.
///
/// `next_delay` advances the attempt counter; `reset` is called after a
/// successful connect so the next failure starts from the base delay again.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Forget accumulated failures.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// The capped exponential delay for `attempt`, without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.config.multiplier.powi(attempt.min(32) as i32);
        let millis = self.config.base.as_millis() as f64 * exp;
        let capped = millis.min(self.config.cap.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Next jittered delay, advancing the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        jittered(delay, self.config.jitter)
    }
}

/// Apply ±`fraction` uniform jitter to `delay`.
fn jittered(delay: Duration, fraction: f64) -> Duration {
    if fraction <= 0.0 {
        return delay;
    }
    let millis = delay.as_millis() as f64;
    let factor = rand::thread_rng().gen_range((1.0 - fraction)..=(1.0 + fraction));
    Duration::from_millis((millis * factor) as u64)
}
