//! Configuration file handling for ~/.onair/config.ini.
//!
//! Production startup uses [`Settings::load_required`], which fails fast when
//! the file is missing (exit code 1 in the CLI). Setup flows can use
//! [`Settings::load_or_default`] to start from defaults instead.

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::Settings;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The config file does not exist at the expected path
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl Settings {
    /// Load configuration from the default path (~/.onair/config.ini),
    /// failing if the file does not exist.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_required(&path)
    }

    /// Load configuration from a specific path, failing if it is missing.
    pub fn load_required(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Err(ConfigFileError::NotFound(path.to_path_buf()));
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Load configuration from a specific path, falling back to defaults
    /// when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }
}

/// Get the path to the config directory (~/.onair).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".onair")
}

/// Get the path to the config file (~/.onair/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
