//! Command-line driver for the colloquy speech coordinator.

#![deny(unused_crate_dependencies)]

// Used by the binary only
use tracing_subscriber as _;

pub mod commands;
pub mod config;
pub mod handlers;
pub mod parser;

pub use commands::Commands;
pub use config::{Overrides, resolve_settings};
pub use parser::Cli;
