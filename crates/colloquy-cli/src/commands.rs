//! Subcommand definitions.

use std::path::PathBuf;

use clap::Subcommand;
use colloquy_core::Priority;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue each text for synthesis and report the order they finish in
    Speak {
        /// Texts to speak, one request each
        #[arg(required = true)]
        texts: Vec<String>,

        /// Priority for every request: low, normal or high
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Simulated speaking time per word (ms)
        #[arg(long, default_value_t = 120)]
        per_word_ms: u64,
    },

    /// Run listen → process → speak turns against a scripted user
    Converse {
        /// JSON file with one recognition script per user turn
        #[arg(short, long)]
        script: PathBuf,

        /// Stop after this many turns (default: every scripted turn)
        #[arg(short, long)]
        turns: Option<usize>,
    },

    /// Print the effective settings as JSON
    ShowConfig,
}
