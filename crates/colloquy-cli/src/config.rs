//! Settings resolution: config file, then command-line overrides, then
//! validation.

use std::path::Path;

use anyhow::{Context, Result};
use colloquy_core::{CoordinatorSettings, SettingsUpdate, StopBehavior, validate_settings};

use crate::parser::Cli;

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub silence_timeout_ms: Option<u64>,
    pub stop_behavior: Option<StopBehavior>,
}

impl From<&Cli> for Overrides {
    fn from(cli: &Cli) -> Self {
        Self {
            silence_timeout_ms: cli.silence_timeout_ms,
            stop_behavior: cli.stop_behavior,
        }
    }
}

impl Overrides {
    fn as_update(self) -> SettingsUpdate {
        SettingsUpdate {
            silence_timeout_ms: self.silence_timeout_ms.map(Some),
            stop_behavior: self.stop_behavior.map(Some),
            ..Default::default()
        }
    }
}

/// Read settings from `path`, or start from defaults when there is none.
pub fn load_settings(path: Option<&Path>) -> Result<CoordinatorSettings> {
    let Some(path) = path else {
        return Ok(CoordinatorSettings::with_defaults());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Load, override and validate.
pub fn resolve_settings(path: Option<&Path>, overrides: Overrides) -> Result<CoordinatorSettings> {
    let mut settings = load_settings(path)?;
    settings.merge(&overrides.as_update());
    validate_settings(&settings).context("Invalid settings")?;
    Ok(settings)
}

/// Settings with every field filled in by its effective value.
pub fn effective(settings: &CoordinatorSettings) -> CoordinatorSettings {
    CoordinatorSettings {
        silence_timeout_ms: Some(
            u64::try_from(settings.silence_timeout().as_millis()).unwrap_or(u64::MAX),
        ),
        auto_restart_delay_ms: Some(
            u64::try_from(settings.auto_restart_delay().as_millis()).unwrap_or(u64::MAX),
        ),
        default_priority: Some(settings.effective_default_priority()),
        stop_behavior: Some(settings.effective_stop_behavior()),
        turn_taking: Some(settings.turn_taking_enabled()),
        max_queue_size: Some(settings.effective_max_queue_size()),
        max_auto_recoveries: Some(settings.effective_max_auto_recoveries()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::{DEFAULT_SILENCE_TIMEOUT_MS, Priority};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_no_file_uses_defaults() {
        let settings = resolve_settings(None, Overrides::default()).unwrap();
        assert_eq!(settings, CoordinatorSettings::with_defaults());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config(r#"{"default_priority": "high", "turn_taking": false}"#);
        let settings = resolve_settings(Some(file.path()), Overrides::default()).unwrap();

        assert_eq!(settings.effective_default_priority(), Priority::High);
        assert!(!settings.turn_taking_enabled());
        assert_eq!(
            effective(&settings).silence_timeout_ms,
            Some(DEFAULT_SILENCE_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_flags_override_file() {
        let file = write_config(r#"{"silence_timeout_ms": 3000, "stop_behavior": "pause"}"#);
        let overrides = Overrides {
            silence_timeout_ms: Some(1200),
            stop_behavior: Some(StopBehavior::Finalize),
        };
        let settings = resolve_settings(Some(file.path()), overrides).unwrap();

        assert_eq!(settings.silence_timeout_ms, Some(1200));
        assert_eq!(settings.effective_stop_behavior(), StopBehavior::Finalize);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config(r#"{"max_queue_size": 0}"#);
        let err = resolve_settings(Some(file.path()), Overrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Max queue size"));
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let file = write_config("{ not json");
        let err = load_settings(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(load_settings(Some(&missing)).is_err());
    }
}
