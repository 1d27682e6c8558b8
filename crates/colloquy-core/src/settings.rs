//! Coordinator settings and validation.
//!
//! All fields are optional so that partial config files and runtime updates
//! fall back to defaults through the `effective_*` accessors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::request::Priority;

/// Default silence countdown before an utterance is finalized.
pub const DEFAULT_SILENCE_TIMEOUT_MS: u64 = 8000;

/// Default pause between the end of a reply and listening again.
pub const DEFAULT_AUTO_RESTART_DELAY_MS: u64 = 500;

/// Default maximum number of queued requests.
pub const DEFAULT_MAX_QUEUE_SIZE: u32 = 32;

/// Default number of automatic recoveries before staying in `Error`.
pub const DEFAULT_MAX_AUTO_RECOVERIES: u32 = 3;

/// What `stop_listening` does with a pending transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBehavior {
    /// Submit the pending transcript immediately (move to `Processing`).
    Finalize,
    /// Discard the pending transcript and return to `Idle`.
    #[default]
    Pause,
}

/// Coordinator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// Silence countdown in milliseconds (500–60000).
    pub silence_timeout_ms: Option<u64>,

    /// Delay before turn-taking restarts listening (0–10000 ms).
    pub auto_restart_delay_ms: Option<u64>,

    /// Priority used when a caller does not give one.
    pub default_priority: Option<Priority>,

    /// Manual stop behavior while listening.
    pub stop_behavior: Option<StopBehavior>,

    /// Whether to listen again after a reply has been spoken.
    pub turn_taking: Option<bool>,

    /// Maximum number of queued requests (1–1024).
    pub max_queue_size: Option<u32>,

    /// Consecutive automatic recoveries before staying in `Error`.
    pub max_auto_recoveries: Option<u32>,
}

impl CoordinatorSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            silence_timeout_ms: Some(DEFAULT_SILENCE_TIMEOUT_MS),
            auto_restart_delay_ms: Some(DEFAULT_AUTO_RESTART_DELAY_MS),
            default_priority: Some(Priority::Normal),
            stop_behavior: Some(StopBehavior::Pause),
            turn_taking: Some(true),
            max_queue_size: Some(DEFAULT_MAX_QUEUE_SIZE),
            max_auto_recoveries: Some(DEFAULT_MAX_AUTO_RECOVERIES),
        }
    }

    /// Effective silence timeout.
    #[must_use]
    pub const fn silence_timeout(&self) -> Duration {
        match self.silence_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_millis(DEFAULT_SILENCE_TIMEOUT_MS),
        }
    }

    /// Effective turn-taking restart delay.
    #[must_use]
    pub const fn auto_restart_delay(&self) -> Duration {
        match self.auto_restart_delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_millis(DEFAULT_AUTO_RESTART_DELAY_MS),
        }
    }

    /// Effective default priority.
    #[must_use]
    pub fn effective_default_priority(&self) -> Priority {
        self.default_priority.unwrap_or_default()
    }

    /// Effective stop behavior.
    #[must_use]
    pub fn effective_stop_behavior(&self) -> StopBehavior {
        self.stop_behavior.unwrap_or_default()
    }

    /// Whether turn-taking is enabled.
    #[must_use]
    pub fn turn_taking_enabled(&self) -> bool {
        self.turn_taking.unwrap_or(true)
    }

    /// Effective maximum queue size.
    #[must_use]
    pub fn effective_max_queue_size(&self) -> u32 {
        self.max_queue_size.unwrap_or(DEFAULT_MAX_QUEUE_SIZE)
    }

    /// Effective recovery budget.
    #[must_use]
    pub fn effective_max_auto_recoveries(&self) -> u32 {
        self.max_auto_recoveries.unwrap_or(DEFAULT_MAX_AUTO_RECOVERIES)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(timeout) = other.silence_timeout_ms {
            self.silence_timeout_ms = timeout;
        }
        if let Some(delay) = other.auto_restart_delay_ms {
            self.auto_restart_delay_ms = delay;
        }
        if let Some(priority) = other.default_priority {
            self.default_priority = priority;
        }
        if let Some(behavior) = other.stop_behavior {
            self.stop_behavior = behavior;
        }
        if let Some(turn_taking) = other.turn_taking {
            self.turn_taking = turn_taking;
        }
        if let Some(size) = other.max_queue_size {
            self.max_queue_size = size;
        }
        if let Some(budget) = other.max_auto_recoveries {
            self.max_auto_recoveries = budget;
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset the field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub silence_timeout_ms: Option<Option<u64>>,
    pub auto_restart_delay_ms: Option<Option<u64>>,
    pub default_priority: Option<Option<Priority>>,
    pub stop_behavior: Option<Option<StopBehavior>>,
    pub turn_taking: Option<Option<bool>>,
    pub max_queue_size: Option<Option<u32>>,
    pub max_auto_recoveries: Option<Option<u32>>,
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Silence timeout must be between 500 and 60000 ms, got {0}")]
    InvalidSilenceTimeout(u64),

    #[error("Auto-restart delay must be at most 10000 ms, got {0}")]
    InvalidRestartDelay(u64),

    #[error("Max queue size must be between 1 and 1024, got {0}")]
    InvalidQueueSize(u32),
}

/// Validate settings values.
pub fn validate_settings(settings: &CoordinatorSettings) -> Result<(), SettingsError> {
    if let Some(timeout) = settings.silence_timeout_ms {
        if !(500..=60_000).contains(&timeout) {
            return Err(SettingsError::InvalidSilenceTimeout(timeout));
        }
    }

    if let Some(delay) = settings.auto_restart_delay_ms {
        if delay > 10_000 {
            return Err(SettingsError::InvalidRestartDelay(delay));
        }
    }

    if let Some(size) = settings.max_queue_size {
        if !(1..=1024).contains(&size) {
            return Err(SettingsError::InvalidQueueSize(size));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CoordinatorSettings::with_defaults();
        assert_eq!(settings.silence_timeout(), Duration::from_secs(8));
        assert_eq!(settings.auto_restart_delay(), Duration::from_millis(500));
        assert_eq!(settings.effective_default_priority(), Priority::Normal);
        assert_eq!(settings.effective_stop_behavior(), StopBehavior::Pause);
        assert!(settings.turn_taking_enabled());
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = CoordinatorSettings::default();
        assert_eq!(settings.silence_timeout(), Duration::from_secs(8));
        assert_eq!(settings.effective_max_queue_size(), DEFAULT_MAX_QUEUE_SIZE);
        assert_eq!(
            settings.effective_max_auto_recoveries(),
            DEFAULT_MAX_AUTO_RECOVERIES
        );
    }

    #[test]
    fn test_validate_silence_timeout_out_of_range() {
        let settings = CoordinatorSettings {
            silence_timeout_ms: Some(100),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidSilenceTimeout(100))
        ));
    }

    #[test]
    fn test_validate_restart_delay_too_large() {
        let settings = CoordinatorSettings {
            auto_restart_delay_ms: Some(60_000),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidRestartDelay(60_000))
        ));
    }

    #[test]
    fn test_validate_queue_size() {
        let settings = CoordinatorSettings {
            max_queue_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidQueueSize(0))
        ));
    }

    #[test]
    fn test_merge_settings() {
        let mut settings = CoordinatorSettings::with_defaults();
        let update = SettingsUpdate {
            silence_timeout_ms: Some(Some(2000)),
            stop_behavior: Some(Some(StopBehavior::Finalize)),
            turn_taking: Some(None), // Back to default
            ..Default::default()
        };
        settings.merge(&update);

        assert_eq!(settings.silence_timeout(), Duration::from_secs(2));
        assert_eq!(settings.effective_stop_behavior(), StopBehavior::Finalize);
        assert_eq!(settings.turn_taking, None);
        assert!(settings.turn_taking_enabled());
        assert_eq!(settings.max_queue_size, Some(DEFAULT_MAX_QUEUE_SIZE)); // Unchanged
    }

    #[test]
    fn test_deserialize_partial_file() {
        let settings: CoordinatorSettings =
            serde_json::from_str(r#"{"silence_timeout_ms": 3000, "stop_behavior": "finalize"}"#)
                .unwrap();
        assert_eq!(settings.silence_timeout(), Duration::from_secs(3));
        assert_eq!(settings.effective_stop_behavior(), StopBehavior::Finalize);
        assert_eq!(settings.auto_restart_delay_ms, None);
    }
}
