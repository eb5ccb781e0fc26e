//! Logger implementation backed by the global `tracing` subscriber.

use super::r#trait::{LogLevel, Logger};

/// Forwards [`Logger`] calls to `tracing` events.
///
/// An optional target string is attached so log output can be filtered
/// per component via `RUST_LOG`.
#[derive(Debug, Default, Clone)]
pub struct TracingLogger {
    component: Option<String>,
}

impl TracingLogger {
    /// Create a logger without a component label.
    pub fn new() -> Self {
        Self { component: None }
    }

    /// Create a logger labeled with a component name.
    pub fn for_component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
        }
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        let component = self.component.as_deref().unwrap_or("onair");
        match level {
            LogLevel::Debug => tracing::debug!(component, "{}", message),
            LogLevel::Info => tracing::info!(component, "{}", message),
            LogLevel::Warn => tracing::warn!(component, "{}", message),
            LogLevel::Error => tracing::error!(component, "{}", message),
        }
    }
}
