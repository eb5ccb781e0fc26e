//! Diagnostics events for background-task failures.
//!
//! Background tasks never let errors escape; they convert them into
//! [`DiagnosticEvent`]s and publish them on the bus under
//! [`DIAGNOSTICS_TOPIC`]. The CLI subscribes and logs them at warn.

use chrono::{DateTime, Utc};

/// Bus topic carrying diagnostics events.
pub const DIAGNOSTICS_TOPIC: &str = "diagnostics";

/// Severity of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

/// A background-task failure report.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    /// Component that caught the failure (e.g. "lifecycle:tiktok").
    pub component: String,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl DiagnosticEvent {
    /// Build a warning-level diagnostic.
    pub fn warning(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
            at: Utc::now(),
        }
    }

    /// Build an error-level diagnostic.
    pub fn error(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_constructor() {
        let event = DiagnosticEvent::warning("lifecycle:tiktok", "detection failed");
        assert_eq!(event.severity, DiagnosticSeverity::Warning);
        assert_eq!(event.component, "lifecycle:tiktok");
    }

    #[test]
    fn test_error_constructor() {
        let event = DiagnosticEvent::error("display", "scene call failed");
        assert_eq!(event.severity, DiagnosticSeverity::Error);
        assert_eq!(event.message, "scene call failed");
    }
}
