//! CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use colloquy_cli::handlers::{converse, show_config, speak};
use colloquy_cli::{Cli, Commands, Overrides, resolve_settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = resolve_settings(cli.config.as_deref(), Overrides::from(&cli))?;

    match cli.command {
        Commands::Speak {
            texts,
            priority,
            per_word_ms,
        } => {
            let order = speak::execute(settings, texts, priority, per_word_ms).await?;
            for (position, text) in order.iter().enumerate() {
                println!("{}. {text}", position + 1);
            }
        }
        Commands::Converse { script, turns } => {
            let script = converse::ConversationScript::load(&script)?;
            let heard = converse::execute(settings, script, turns).await?;
            println!("✓ Conversation finished after {} turn(s).", heard.len());
        }
        Commands::ShowConfig => {
            println!("{}", show_config::render(&settings)?);
        }
    }

    Ok(())
}
