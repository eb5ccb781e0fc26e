//! Per-platform connection lifecycle.
//!
//! One [`ConnectionSupervisor`] per enabled platform owns the connect /
//! disconnect state machine: stream detection with bounded retries,
//! adapter initialization, jittered exponential reconnect backoff, stale
//! connect recovery, and cleanup with a hard timeout on stop. Nothing else
//! writes connection state.

mod backoff;
mod detector;
mod state;
mod supervisor;

pub use backoff::{Backoff, BackoffConfig};
pub use detector::{DetectError, StreamDetector};
pub use state::ConnectionState;
pub use supervisor::{ConnectionSupervisor, LifecycleConfig, LifecycleError};
