//! OnAir - live-stream companion core
//!
//! This library ingests real-time events from creator platforms (Twitch,
//! YouTube, TikTok), normalizes them into a canonical envelope, routes them
//! through feature gates, suppression and deduplication, and drives two
//! effectors: an on-screen overlay (scene-control WebSocket) and a
//! text-to-speech engine.
//!
//! # High-Level API
//!
//! For most use cases, the [`runtime`] module provides a builder facade:
//!
//! ```ignore
//! use onair::config::Settings;
//! use onair::runtime::RuntimeBuilder;
//!
//! let settings = Settings::load_required(&path)?;
//! let runtime = RuntimeBuilder::new(settings)
//!     .with_adapter(twitch_adapter, detector)
//!     .build();
//!
//! runtime.run_until_shutdown().await?;
//! ```

pub mod adapter;
pub mod bus;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod effector;
pub mod envelope;
pub mod lifecycle;
pub mod log;
pub mod logging;
pub mod notify;
pub mod router;
pub mod runtime;
pub mod suppression;
pub mod timer;
pub mod tts;

/// Version of the OnAir library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
