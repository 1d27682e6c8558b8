//! `converse` command: scripted user turns against an echoing assistant.
//!
//! Script format:
//!
//! ```json
//! {
//!   "per_word_ms": 80,
//!   "turns": [
//!     [{"delay_ms": 300, "transcript": "what's the"},
//!      {"delay_ms": 400, "transcript": "what's the weather", "is_final": true}],
//!     [{"delay_ms": 500, "transcript": "thanks", "is_final": true}]
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use colloquy_core::{
    ConversationState, CoordinatorSettings, CoordinatorSnapshot, OperationKind, SynthesisOptions,
};
use colloquy_speech::{
    RecognitionStep, RequestCallbacks, SimulatedEngine, SimulatedEngineConfig, SpeechCoordinator,
    SpeechEngine,
};
use serde::Deserialize;

/// Longest wait for any single step of a turn.
const TURN_TIMEOUT: Duration = Duration::from_secs(120);

/// Scripted user side of the conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationScript {
    #[serde(default = "default_per_word_ms")]
    pub per_word_ms: u64,
    pub turns: Vec<Vec<RecognitionStep>>,
}

const fn default_per_word_ms() -> u64 {
    80
}

impl ConversationScript {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }
}

/// What the assistant says back.
pub fn reply_to(utterance: &str) -> String {
    format!("You said: {utterance}")
}

/// Run the conversation and return the utterances heard, in order.
///
/// Every published snapshot is printed to stdout as one JSON line.
pub async fn execute(
    settings: CoordinatorSettings,
    script: ConversationScript,
    turns: Option<usize>,
) -> Result<Vec<String>> {
    let turns = turns.unwrap_or(script.turns.len()).min(script.turns.len());
    if turns == 0 {
        bail!("Script contains no turns");
    }

    let simulated = Arc::new(SimulatedEngine::new(SimulatedEngineConfig {
        per_word_ms: script.per_word_ms,
        ..Default::default()
    }));
    for steps in script.turns {
        simulated.push_session(steps);
    }
    let engine: Arc<dyn SpeechEngine> = simulated.clone();

    let settings = CoordinatorSettings {
        turn_taking: Some(true),
        ..settings
    };
    let coordinator = SpeechCoordinator::spawn(engine, settings).context("Invalid settings")?;
    coordinator.on_state_change(Arc::new(print_snapshot))?;

    coordinator
        .listen(RequestCallbacks::new(), None)
        .await
        .context("Failed to start listening")?;

    let mut heard = Vec::with_capacity(turns);
    for turn in 1..=turns {
        let snapshot = wait_for(&coordinator, |s| {
            s.conversation == ConversationState::Processing
                || s.conversation == ConversationState::Error
        })
        .await
        .with_context(|| format!("Turn {turn}: no utterance"))?;

        if snapshot.conversation == ConversationState::Error {
            let message = snapshot
                .last_error
                .map_or_else(|| "speech failed".to_string(), |e| e.user_message());
            bail!("Turn {turn}: {message}");
        }

        let utterance = snapshot.transcript.unwrap_or_default();
        tracing::info!(turn, %utterance, "Heard");
        coordinator
            .speak(
                reply_to(&utterance),
                SynthesisOptions::default(),
                RequestCallbacks::new(),
                None,
            )
            .await
            .with_context(|| format!("Turn {turn}: failed to reply"))?;
        heard.push(utterance);
    }

    // Let the last reply finish before tearing down.
    wait_for(&coordinator, |s| s.operation != OperationKind::Synthesis)
        .await
        .context("Final reply did not finish")?;
    coordinator.shutdown().await?;

    let unplayed = simulated.remaining_sessions();
    if unplayed > 0 {
        tracing::debug!(unplayed, "Scripted turns left unplayed");
    }
    Ok(heard)
}

async fn wait_for(
    coordinator: &SpeechCoordinator,
    predicate: impl FnMut(&CoordinatorSnapshot) -> bool,
) -> Result<CoordinatorSnapshot> {
    let mut watch = coordinator.watch();
    let snapshot = tokio::time::timeout(TURN_TIMEOUT, watch.wait_for(predicate))
        .await
        .context("Timed out waiting for the conversation")?
        .map_err(|_| anyhow!("Speech coordinator stopped unexpectedly"))?;
    Ok(snapshot.clone())
}

fn print_snapshot(snapshot: &CoordinatorSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to render snapshot"),
    }
}
