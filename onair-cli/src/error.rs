//! CLI error handling with exit codes.
//!
//! Exit codes from the embedding process: 0 normal, 1 configuration error,
//! 2 fatal connection error after exhausting retries.

use std::fmt;
use std::process;

use onair::runtime::RuntimeError;

/// CLI-level errors with user-facing messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration missing or invalid
    Config(String),
    /// A platform connection failed terminally
    FatalConnection(String),
}

impl CliError {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::LoggingInit(_) | CliError::Config(_) => 1,
            CliError::FatalConnection(_) => 2,
        }
    }

    /// Print the error and exit with the appropriate code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {self}");

        if let CliError::Config(_) = self {
            eprintln!();
            eprintln!("Create a config file at ~/.onair/config.ini or pass --config <path>.");
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(message) => {
                write!(f, "Failed to initialize logging: {message}")
            }
            CliError::Config(message) => write!(f, "{message}"),
            CliError::FatalConnection(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<onair::config::ConfigFileError> for CliError {
    fn from(error: onair::config::ConfigFileError) -> Self {
        CliError::Config(error.to_string())
    }
}

impl From<RuntimeError> for CliError {
    fn from(error: RuntimeError) -> Self {
        CliError::FatalConnection(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("missing".to_string()).exit_code(), 1);
        assert_eq!(CliError::LoggingInit("io".to_string()).exit_code(), 1);
        assert_eq!(
            CliError::FatalConnection("gone".to_string()).exit_code(),
            2
        );
    }

    #[test]
    fn test_config_error_carries_message() {
        let error = CliError::Config("Configuration file not found: /tmp/x".to_string());
        assert!(error.to_string().contains("Configuration file not found"));
    }
}
