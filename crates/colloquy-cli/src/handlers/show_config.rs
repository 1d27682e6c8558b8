//! `show-config` command.

use anyhow::{Context, Result};
use colloquy_core::CoordinatorSettings;

use crate::config::effective;

/// Render the effective settings as pretty JSON.
pub fn render(settings: &CoordinatorSettings) -> Result<String> {
    serde_json::to_string_pretty(&effective(settings)).context("Failed to serialize settings")
}
