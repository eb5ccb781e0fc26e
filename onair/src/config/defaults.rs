//! Default configuration values.
//!
//! These constants are the single source of truth for defaults; the settings
//! structs and the INI parser both derive from them.

/// Maximum notifications per user inside one suppression window.
pub const DEFAULT_MAX_NOTIFICATIONS_PER_USER: u32 = 5;

/// Width of the per-user rate-limit window.
pub const DEFAULT_SUPPRESSION_WINDOW_MS: u64 = 60_000;

/// How long a rate-limited user stays suppressed.
pub const DEFAULT_SUPPRESSION_DURATION_MS: u64 = 120_000;

/// Interval between store cleanup sweeps.
pub const DEFAULT_SUPPRESSION_CLEANUP_INTERVAL_MS: u64 = 30_000;

/// Dedup TTL for monetization event ids (10 minutes).
pub const DEFAULT_DEDUP_TTL_MS: u64 = 600_000;

/// Idle time after which an open combo group settles (2 seconds).
pub const DEFAULT_COMBO_TIMEOUT_MS: u64 = 2_000;

/// Upper bound on store entries before oldest-first eviction.
pub const DEFAULT_STORE_MAX_ENTRIES: usize = 10_000;

/// Seconds between stream-detection attempts.
pub const DEFAULT_STREAM_RETRY_INTERVAL_SECS: u64 = 30;

/// Detection attempts before giving up; negative means retry forever.
pub const DEFAULT_STREAM_MAX_RETRIES: i32 = 20;

/// Seconds between liveness probes once connected.
pub const DEFAULT_CONTINUOUS_MONITORING_INTERVAL_SECS: u64 = 60;

/// Seconds between viewer-count polls.
pub const DEFAULT_VIEWER_COUNT_POLLING_INTERVAL_SECS: u64 = 30;

/// Longest sanitized message forwarded to the overlay or TTS.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 200;

/// Scene-control WebSocket address.
pub const DEFAULT_OBS_ADDRESS: &str = "ws://127.0.0.1:4455";

/// Milliseconds to wait for the scene-control handshake.
pub const DEFAULT_OBS_CONNECTION_TIMEOUT_MS: u64 = 10_000;

/// Overlay group holding the chat text sources.
pub const DEFAULT_CHAT_MSG_GROUP: &str = "ChatGroup";

/// Overlay group holding the notification text sources.
pub const DEFAULT_NOTIFICATION_MSG_GROUP: &str = "NotificationGroup";

/// Milliseconds for overlay fade in/out.
pub const DEFAULT_FADE_DURATION_MS: u64 = 300;

/// Milliseconds between scene transitions.
pub const DEFAULT_TRANSITION_DELAY_MS: u64 = 100;

/// Milliseconds a chat message stays on screen.
pub const DEFAULT_CHAT_MESSAGE_DURATION_MS: u64 = 8_000;

/// Milliseconds of quiet between cleared and next notification.
pub const DEFAULT_NOTIFICATION_CLEAR_DELAY_MS: u64 = 500;

/// Default notification display duration.
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 6_000;

/// Most-recent scene calls buffered while the effector is not yet identified.
pub const DEFAULT_READINESS_BUFFER_SIZE: usize = 16;

/// TTS provider command used when none is configured.
pub const DEFAULT_TTS_PROVIDER: &str = "espeak";

/// Fallback TTS provider command.
pub const DEFAULT_TTS_FALLBACK_PROVIDER: &str = "say";

/// Window inside which identical consecutive TTS texts are dropped.
pub const DEFAULT_TTS_DEDUP_WINDOW_MS: u64 = 5_000;
