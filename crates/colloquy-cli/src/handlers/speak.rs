//! `speak` command: queue texts and report completion order.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use colloquy_core::{CoordinatorSettings, Priority, SynthesisOptions};
use colloquy_speech::{
    RequestCallbacks, SimulatedEngine, SimulatedEngineConfig, SpeechCoordinator, SpeechEngine,
};

/// Speak every text and return them in the order they finished.
pub async fn execute(
    settings: CoordinatorSettings,
    texts: Vec<String>,
    priority: Option<Priority>,
    per_word_ms: u64,
) -> Result<Vec<String>> {
    let engine: Arc<dyn SpeechEngine> = Arc::new(SimulatedEngine::new(SimulatedEngineConfig {
        per_word_ms,
        ..Default::default()
    }));
    let settings = CoordinatorSettings {
        turn_taking: Some(false),
        ..settings
    };
    let coordinator = SpeechCoordinator::spawn(engine, settings).context("Invalid settings")?;

    let finished = Arc::new(Mutex::new(Vec::new()));
    for text in texts {
        let done = Arc::clone(&finished);
        let label = text.clone();
        let id = coordinator
            .speak(
                text,
                SynthesisOptions::default(),
                RequestCallbacks::new()
                    .on_end(move || push(&done, label.clone()))
                    .on_error(|e| tracing::warn!(error = %e, "Synthesis failed")),
                priority,
            )
            .await
            .with_context(|| "Failed to queue text")?;
        tracing::info!(request = %id, "Queued");
    }

    let mut watch = coordinator.watch();
    watch
        .wait_for(colloquy_core::CoordinatorSnapshot::is_quiescent)
        .await
        .map_err(|_| anyhow!("Speech coordinator stopped unexpectedly"))?;
    coordinator.shutdown().await?;

    let order = finished
        .lock()
        .map_err(|_| anyhow!("Completion log poisoned"))?
        .clone();
    Ok(order)
}

fn push(log: &Mutex<Vec<String>>, entry: String) {
    if let Ok(mut log) = log.lock() {
        log.push(entry);
    }
}
