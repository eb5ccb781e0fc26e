//! No-op logger implementation.

use super::r#trait::{LogLevel, Logger};

/// Logger that discards all messages.
///
/// Useful in tests and for components constructed before logging is
/// initialized.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}
