//! Speech error taxonomy.
//!
//! These errors are serializable so they can travel inside state snapshots
//! to UI collaborators. Engine-specific error types are mapped into this
//! taxonomy at the adapter boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sub-kind of a recognition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionErrorKind {
    /// The recognition service could not be reached.
    Network,
    /// No speech was heard before the engine gave up.
    NoSpeech,
    /// Speech was heard but nothing could be matched.
    NoMatch,
    /// The microphone could not be opened or read.
    AudioCapture,
    /// The engine aborted the session.
    Aborted,
    /// Anything the engine reports that is not classified above.
    Other,
}

impl RecognitionErrorKind {
    /// Wire label for the sub-kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::NoSpeech => "no-speech",
            Self::NoMatch => "no-match",
            Self::AudioCapture => "audio-capture",
            Self::Aborted => "aborted",
            Self::Other => "other",
        }
    }
}

/// Error surfaced to a request's `on_error` callback and to state observers.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeechError {
    /// No speech capability is present in the runtime.
    #[error("Speech capability unavailable: {message}")]
    ResourceUnavailable {
        /// Detailed error message.
        message: String,
    },

    /// Microphone or audio access was refused.
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Detailed error message.
        message: String,
    },

    /// The engine reported a synthesis error.
    #[error("Speech synthesis failed: {message}")]
    SynthesisFailure {
        /// Detailed error message.
        message: String,
    },

    /// The engine reported a recognition error.
    #[error("Speech recognition failed ({}): {message}", .kind.label())]
    RecognitionFailure {
        /// Sub-kind of the failure.
        #[serde(rename = "recognitionKind")]
        kind: RecognitionErrorKind,
        /// Detailed error message.
        message: String,
    },

    /// The request could not be accepted.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Detailed error message.
        message: String,
    },
}

impl SpeechError {
    /// Create a resource unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            message: message.into(),
        }
    }

    /// Create a permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a synthesis failure.
    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::SynthesisFailure {
            message: message.into(),
        }
    }

    /// Create a recognition failure of the given sub-kind.
    pub fn recognition(kind: RecognitionErrorKind, message: impl Into<String>) -> Self {
        Self::RecognitionFailure {
            kind,
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Map an engine error code to the taxonomy.
    ///
    /// Codes follow the common speech-engine vocabulary (`"not-allowed"`,
    /// `"no-speech"`, `"audio-capture"`, ...). Unknown codes become
    /// `RecognitionFailure` with kind `Other`.
    pub fn from_engine_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "not-allowed" | "service-not-allowed" | "permission-denied" => {
                Self::PermissionDenied { message }
            }
            "unavailable" | "not-supported" => Self::ResourceUnavailable { message },
            "synthesis-failed" | "synthesis-unavailable" | "audio-busy" => {
                Self::SynthesisFailure { message }
            }
            "network" => Self::recognition(RecognitionErrorKind::Network, message),
            "no-speech" => Self::recognition(RecognitionErrorKind::NoSpeech, message),
            "no-match" => Self::recognition(RecognitionErrorKind::NoMatch, message),
            "audio-capture" => Self::recognition(RecognitionErrorKind::AudioCapture, message),
            "aborted" => Self::recognition(RecognitionErrorKind::Aborted, message),
            _ => Self::recognition(RecognitionErrorKind::Other, message),
        }
    }

    /// Silence-class errors resolve the request normally instead of raising
    /// the conversation `Error` state.
    #[must_use]
    pub const fn is_silence(&self) -> bool {
        matches!(
            self,
            Self::RecognitionFailure {
                kind: RecognitionErrorKind::NoSpeech | RecognitionErrorKind::NoMatch,
                ..
            }
        )
    }

    /// Hard errors keep the conversation in `Error` until an explicit reset.
    #[must_use]
    pub const fn is_hard(&self) -> bool {
        matches!(
            self,
            Self::ResourceUnavailable { .. } | Self::PermissionDenied { .. }
        )
    }

    /// Short label of the error kind.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::ResourceUnavailable { .. } => "resource_unavailable",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::SynthesisFailure { .. } => "synthesis_failure",
            Self::RecognitionFailure { .. } => "recognition_failure",
            Self::InvalidRequest { .. } => "invalid_request",
        }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ResourceUnavailable { .. } => {
                "Speech is not available on this device.".to_string()
            }
            Self::PermissionDenied { .. } => {
                "Microphone access was denied. Allow access and reset voice mode.".to_string()
            }
            Self::SynthesisFailure { message } => format!("Could not speak the reply: {message}"),
            Self::RecognitionFailure {
                kind: RecognitionErrorKind::Network,
                ..
            } => "Speech recognition needs a network connection.".to_string(),
            Self::RecognitionFailure {
                kind: RecognitionErrorKind::AudioCapture,
                ..
            } => "No microphone could be opened.".to_string(),
            Self::RecognitionFailure { message, .. } => {
                format!("Speech recognition failed: {message}")
            }
            Self::InvalidRequest { message } => message.clone(),
        }
    }
}

/// Convenience result type for speech operations.
pub type SpeechResult<T> = Result<T, SpeechError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_codes_map_to_kinds() {
        assert!(matches!(
            SpeechError::from_engine_code("not-allowed", "denied"),
            SpeechError::PermissionDenied { .. }
        ));
        assert!(matches!(
            SpeechError::from_engine_code("unavailable", "none"),
            SpeechError::ResourceUnavailable { .. }
        ));
        assert_eq!(
            SpeechError::from_engine_code("audio-capture", "mic"),
            SpeechError::recognition(RecognitionErrorKind::AudioCapture, "mic")
        );
        assert_eq!(
            SpeechError::from_engine_code("weird", "?"),
            SpeechError::recognition(RecognitionErrorKind::Other, "?")
        );
    }

    #[test]
    fn silence_errors_are_not_hard() {
        let err = SpeechError::from_engine_code("no-speech", "quiet");
        assert!(err.is_silence());
        assert!(!err.is_hard());

        let err = SpeechError::from_engine_code("network", "offline");
        assert!(!err.is_silence());
        assert!(!err.is_hard());
    }

    #[test]
    fn hard_errors() {
        assert!(SpeechError::unavailable("no engine").is_hard());
        assert!(SpeechError::permission_denied("mic").is_hard());
        assert!(!SpeechError::synthesis("boom").is_hard());
    }

    #[test]
    fn display_includes_recognition_sub_kind() {
        let err = SpeechError::recognition(RecognitionErrorKind::Network, "offline");
        assert_eq!(err.to_string(), "Speech recognition failed (network): offline");
    }

    #[test]
    fn error_serialization() {
        let err = SpeechError::recognition(RecognitionErrorKind::NoMatch, "mumble");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("recognition_failure"));
        assert!(json.contains("no_match"));

        let parsed: SpeechError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn user_messages() {
        let err = SpeechError::permission_denied("blocked");
        assert!(err.user_message().contains("Microphone"));
        assert_eq!(err.kind_label(), "permission_denied");
    }
}
