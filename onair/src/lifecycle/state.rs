//! Connection state machine states.

/// State of one platform connection.
///
/// Owned by the lifecycle supervisor; other components observe it through a
/// watch channel and never write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no work scheduled.
    Disconnected,
    /// Probing whether the configured channel is live.
    Detecting,
    /// Adapter initialization in flight.
    Connecting,
    /// Adapter initialized and delivering events.
    Connected,
    /// Waiting out a backoff delay before the next connect attempt.
    Retrying,
    /// Terminal: stopped by request or after exhausting retries.
    Stopped,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Detecting => "detecting",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Retrying => "retrying",
            ConnectionState::Stopped => "stopped",
        }
    }

    /// True for states that never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Stopped)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(ConnectionState::Detecting.to_string(), "detecting");
        assert_eq!(ConnectionState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_only_stopped_is_terminal() {
        assert!(ConnectionState::Stopped.is_terminal());
        assert!(!ConnectionState::Disconnected.is_terminal());
        assert!(!ConnectionState::Retrying.is_terminal());
    }
}
