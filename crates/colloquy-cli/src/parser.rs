//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;
use colloquy_core::StopBehavior;

use crate::commands::Commands;

/// Drive the speech coordinator from the command line.
///
/// All speech runs on a simulated engine, so every command works without
/// audio hardware.
#[derive(Parser, Debug)]
#[command(name = "colloquy")]
#[command(about = "Coordinate speech synthesis and recognition turns")]
#[command(version)]
pub struct Cli {
    /// JSON settings file (fields are optional)
    #[arg(long = "config", global = true, env = "COLLOQUY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Override the silence timeout (ms)
    #[arg(long = "silence-timeout-ms", global = true)]
    pub silence_timeout_ms: Option<u64>,

    /// Override what stopping a listen does: finalize or pause
    #[arg(long = "stop-behavior", global = true, value_parser = parse_stop_behavior)]
    pub stop_behavior: Option<StopBehavior>,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_stop_behavior(value: &str) -> Result<StopBehavior, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "finalize" => Ok(StopBehavior::Finalize),
        "pause" => Ok(StopBehavior::Pause),
        other => Err(format!("expected 'finalize' or 'pause', got '{other}'")),
    }
}
