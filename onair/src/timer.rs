//! Cancellable timers tied to shutdown.
//!
//! Raw `tokio::time::sleep` calls scattered across daemons leak pending work
//! on shutdown. [`SafeTimers`] wraps every delay in a race against a
//! [`CancellationToken`] so that `cancel_all()` (or dropping the runtime)
//! releases every sleeper immediately.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a guarded delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The full delay elapsed.
    Elapsed,
    /// Shutdown was signaled before the delay elapsed.
    Cancelled,
}

impl TimerOutcome {
    /// True when the delay ran to completion.
    pub fn elapsed(self) -> bool {
        self == TimerOutcome::Elapsed
    }
}

/// Shutdown-aware timer facility shared by background tasks.
///
/// Cloning is cheap; all clones observe the same cancellation signal.
#[derive(Debug, Clone)]
pub struct SafeTimers {
    token: CancellationToken,
}

impl SafeTimers {
    /// Create a timer facility with its own root token.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Create a timer facility bound to an existing shutdown token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// The underlying cancellation token, for `select!` integration.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Sleep for `duration` unless shutdown fires first.
    pub async fn delay(&self, duration: Duration) -> TimerOutcome {
        tokio::select! {
            _ = self.token.cancelled() => TimerOutcome::Cancelled,
            _ = tokio::time::sleep(duration) => TimerOutcome::Elapsed,
        }
    }

    /// True once shutdown has been signaled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown: every pending and future delay resolves
    /// `Cancelled` immediately.
    pub fn cancel_all(&self) {
        self.token.cancel();
    }
}

impl Default for SafeTimers {
    fn default() -> Self {
        Self::new()
    }
}
