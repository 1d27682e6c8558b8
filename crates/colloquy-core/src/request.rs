//! Request identity, kinds, priorities and lifecycle status.
//!
//! These are pure data types shared by the coordinator and its callers.
//! Nothing here knows about engines, channels or timers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a submitted speech request.
///
/// Assigned by the coordinator at submission time. Identifiers are never
/// reused for the lifetime of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw sequence number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// What a request asks the speech capability to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechKind {
    /// Text to audible speech.
    Synthesis,
    /// Audible speech to text.
    Recognition,
}

/// What the exclusive speech capability is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    #[default]
    Idle,
    Synthesis,
    Recognition,
}

impl From<SpeechKind> for OperationKind {
    fn from(kind: SpeechKind) -> Self {
        match kind {
            SpeechKind::Synthesis => Self::Synthesis,
            SpeechKind::Recognition => Self::Recognition,
        }
    }
}

/// Scheduling priority. `High` preempts an active `Normal` or `Low` request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// All priorities, highest first (dispatch order).
    pub const DISPATCH_ORDER: [Self; 3] = [Self::High, Self::Normal, Self::Low];

    /// Wire label (`"low"`, `"normal"`, `"high"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown priority label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown priority: {0} (expected low, normal or high)")]
pub struct ParsePriorityError(String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(ParsePriorityError(other.to_owned())),
        }
    }
}

/// Lifecycle status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting in the request queue.
    Queued,
    /// Holding the speech capability.
    Active,
    /// Finished normally or stopped by the caller.
    Completed,
    /// Removed before it started, or interrupted by preemption.
    Cancelled,
    /// The engine reported a failure.
    Failed,
}

impl RequestStatus {
    /// Whether the request has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Rendering options for a synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthesisOptions {
    /// Speaking rate multiplier (0.1–10, default 1.0).
    pub rate: f32,
    /// Pitch (0–2, default 1.0).
    pub pitch: f32,
    /// Volume (0–1, default 1.0).
    pub volume: f32,
    /// Engine-specific voice identifier. `None` uses the engine default.
    pub voice: Option<String>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

impl SynthesisOptions {
    /// Set the speaking rate.
    #[must_use]
    pub const fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the pitch.
    #[must_use]
    pub const fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    /// Set the volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Select a voice.
    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Return a copy with every numeric option clamped into its valid range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            rate: self.rate.clamp(0.1, 10.0),
            pitch: self.pitch.clamp(0.0, 2.0),
            volume: self.volume.clamp(0.0, 1.0),
            voice: self.voice.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_high_above_low() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn priority_parses_labels() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn request_id_display() {
        assert_eq!(RequestId::new(7).to_string(), "req-7");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RequestStatus::Queued.is_terminal());
        assert!(!RequestStatus::Active.is_terminal());
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(RequestStatus::Failed.is_terminal());
    }

    #[test]
    fn options_clamp_out_of_range_values() {
        let options = SynthesisOptions::default()
            .with_rate(42.0)
            .with_pitch(-1.0)
            .with_volume(3.0)
            .with_voice("en-GB");
        let clamped = options.clamped();

        assert!((clamped.rate - 10.0).abs() < f32::EPSILON);
        assert!(clamped.pitch.abs() < f32::EPSILON);
        assert!((clamped.volume - 1.0).abs() < f32::EPSILON);
        assert_eq!(clamped.voice.as_deref(), Some("en-GB"));
    }

    #[test]
    fn options_deserialize_partial() {
        let options: SynthesisOptions = serde_json::from_str(r#"{"rate":1.5}"#).unwrap();
        assert!((options.rate - 1.5).abs() < f32::EPSILON);
        assert!((options.volume - 1.0).abs() < f32::EPSILON);
        assert!(options.voice.is_none());
    }
}
