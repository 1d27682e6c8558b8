//! Errors returned by the coordinator handle.

use colloquy_core::{SettingsError, SpeechError};

/// Why a coordinator call did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    /// The coordinator task has stopped.
    #[error("Speech coordinator is not running")]
    Closed,

    /// The submission was refused before it was queued. No callbacks run.
    #[error("Request rejected: {0}")]
    Rejected(#[from] SpeechError),

    /// A settings update failed validation and was not applied.
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),
}

impl CoordinatorError {
    /// The speech error behind a rejection, if any.
    pub const fn speech_error(&self) -> Option<&SpeechError> {
        match self {
            Self::Rejected(error) => Some(error),
            _ => None,
        }
    }
}
