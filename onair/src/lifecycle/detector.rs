//! Stream detection contract.
//!
//! The supervisor cannot connect before the configured channel is actually
//! live; a [`StreamDetector`] answers that question. Implementations call
//! the platform's public status endpoint and belong to the SDK glue outside
//! the core; the core only owns the retry loop around them.

use async_trait::async_trait;
use thiserror::Error;

use crate::envelope::Platform;

/// Stream detection failure.
#[derive(Debug, Clone, Error)]
#[error("stream detection failed for {platform}/{username}: {message}")]
pub struct DetectError {
    pub platform: Platform,
    pub username: String,
    pub message: String,
}

impl DetectError {
    pub fn new(
        platform: Platform,
        username: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            username: username.into(),
            message: message.into(),
        }
    }
}

/// Probe whether a channel is currently live.
#[async_trait]
pub trait StreamDetector: Send + Sync {
    /// True when `username` is live on `platform`.
    ///
    /// A transport failure is an error, not "offline"; the supervisor
    /// treats both the same way (retry) but logs them differently.
    async fn is_live(&self, platform: Platform, username: &str) -> Result<bool, DetectError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_error_message() {
        let err = DetectError::new(Platform::Tiktok, "creator", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "stream detection failed for tiktok/creator: HTTP 503"
        );
    }
}
