//! Configuration loading for ~/.onair/config.ini.
//!
//! The configuration is loaded once at startup and consumed by the rest of
//! the pipeline as a frozen record behind an `Arc`. Settings structs live in
//! [`settings`], constants in [`defaults`], INI parsing in [`parser`], and
//! file I/O in [`file`].

mod defaults;
mod file;
mod parser;
mod settings;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use parser::parse_bool;
pub use settings::{
    GeneralSettings, ObsSettings, PlatformSettings, Settings, TimingSettings, TtsSettings,
};
