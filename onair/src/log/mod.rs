//! Injectable logging seam.
//!
//! Components that need to log through an injected handle (rather than the
//! global `tracing` subscriber) take an `Arc<dyn Logger>`. The handle is
//! validated once at construction; there is no runtime duck-typing.

mod noop;
mod r#trait;
mod tracing_adapter;

pub use noop::NoOpLogger;
pub use r#trait::{LogLevel, Logger};
pub use tracing_adapter::TracingLogger;
