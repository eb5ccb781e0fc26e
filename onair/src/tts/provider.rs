//! Speech synthesis provider contract.
//!
//! Providers wrap an actual synthesizer. [`CommandProvider`] shells out to
//! a local TTS binary (`espeak`, `say`); anything richer (cloud voices)
//! implements the same trait outside the core.

use async_trait::async_trait;
use thiserror::Error;

/// Speech synthesis failure.
#[derive(Debug, Clone, Error)]
#[error("speech provider '{provider}' failed: {message}")]
pub struct SpeakError {
    pub provider: String,
    pub message: String,
}

impl SpeakError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// A speech synthesizer.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Provider name for logging and switch counting.
    fn name(&self) -> &str;

    /// Speak `text`, resolving when playback has been handed off.
    async fn speak(&self, text: &str) -> Result<(), SpeakError>;
}

/// Provider that shells out to a local TTS command.
///
/// The text is passed as a single argument; the command is expected to
/// block until playback finishes (both `espeak` and `say` do).
pub struct CommandProvider {
    command: String,
}

impl CommandProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl SpeechProvider for CommandProvider {
    fn name(&self) -> &str {
        &self.command
    }

    async fn speak(&self, text: &str) -> Result<(), SpeakError> {
        let status = tokio::process::Command::new(&self.command)
            .arg(text)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| SpeakError::new(&self.command, e.to_string()))?;

        if !status.success() {
            return Err(SpeakError::new(
                &self.command,
                format!("exited with {status}"),
            ));
        }
        Ok(())
    }
}
