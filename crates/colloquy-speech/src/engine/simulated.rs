//! Timer-driven speech engine for demos and tests.
//!
//! Synthesis "speaks" for `per_word_ms` per word. Recognition replays a
//! scripted sequence of results, one script per listening session, then stays
//! open until stopped (or ends, with `end_after_script`).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use colloquy_core::{RequestId, SpeechError};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{EngineCapabilities, EngineEventSender, SpeechEngine, SynthesisJob};

/// One scripted recognition result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionStep {
    /// Delay after the previous step.
    pub delay_ms: u64,
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
}

impl RecognitionStep {
    pub fn partial(delay_ms: u64, transcript: impl Into<String>) -> Self {
        Self {
            delay_ms,
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_result(delay_ms: u64, transcript: impl Into<String>) -> Self {
        Self {
            delay_ms,
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// Knobs for [`SimulatedEngine`].
#[derive(Debug, Clone)]
pub struct SimulatedEngineConfig {
    /// Speaking time per word.
    pub per_word_ms: u64,
    pub capabilities: EngineCapabilities,
    /// End recognition as soon as the script is exhausted instead of waiting
    /// for the coordinator to stop it.
    pub end_after_script: bool,
}

impl Default for SimulatedEngineConfig {
    fn default() -> Self {
        Self {
            per_word_ms: 120,
            capabilities: EngineCapabilities::FULL,
            end_after_script: false,
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    sessions: VecDeque<Vec<RecognitionStep>>,
    current: Option<CancellationToken>,
    fail_synthesis: Option<SpeechError>,
    fail_recognition: Option<SpeechError>,
    spoken: Vec<String>,
}

/// In-process engine driven by tokio timers.
///
/// Must be used from within a tokio runtime; each operation runs on its own
/// spawned task.
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    config: SimulatedEngineConfig,
    state: Mutex<EngineState>,
}

impl SimulatedEngine {
    pub fn new(config: SimulatedEngineConfig) -> Self {
        Self {
            config,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Queue the script for the next listening session.
    pub fn push_session(&self, steps: Vec<RecognitionStep>) {
        self.lock().sessions.push_back(steps);
    }

    /// Listening sessions still scripted.
    pub fn remaining_sessions(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Make the next synthesis report `error` instead of speaking.
    pub fn fail_next_synthesis(&self, error: SpeechError) {
        self.lock().fail_synthesis = Some(error);
    }

    /// Make the next recognition report `error` instead of listening.
    pub fn fail_next_recognition(&self, error: SpeechError) {
        self.lock().fail_recognition = Some(error);
    }

    /// Texts handed to synthesis, in order. Injected failures are skipped.
    pub fn spoken(&self) -> Vec<String> {
        self.lock().spoken.clone()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current operation's token with a fresh one.
    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock().current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    fn speaking_time(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count().max(1) as u64;
        Duration::from_millis(self.config.per_word_ms.saturating_mul(words).max(1))
    }

    fn record_spoken(&self, text: String) {
        self.lock().spoken.push(text);
    }
}

impl SpeechEngine for SimulatedEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.config.capabilities
    }

    fn synthesize(&self, job: SynthesisJob, events: EngineEventSender) -> Result<(), SpeechError> {
        if !self.config.capabilities.synthesis {
            return Err(SpeechError::unavailable("Simulated engine has no synthesis"));
        }

        let token = self.begin();
        let failure = self.lock().fail_synthesis.take();
        let duration = self.speaking_time(&job.text);
        debug!(request = %job.request, ?duration, "Simulated synthesis");

        if failure.is_none() {
            self.record_spoken(job.text);
        }

        tokio::spawn(async move {
            if let Some(error) = failure {
                tokio::task::yield_now().await;
                events.errored(error);
                return;
            }

            events.started();
            tokio::select! {
                () = tokio::time::sleep(duration) => {}
                () = token.cancelled() => {
                    debug!(request = %events.request(), "Simulated synthesis cancelled");
                }
            }
            // Real engines report an end after cancel as well.
            events.ended();
        });
        Ok(())
    }

    fn recognize(&self, request: RequestId, events: EngineEventSender) -> Result<(), SpeechError> {
        if !self.config.capabilities.recognition {
            return Err(SpeechError::unavailable("Simulated engine has no recognition"));
        }

        let token = self.begin();
        let (failure, script) = {
            let mut state = self.lock();
            let failure = state.fail_recognition.take();
            let script = if failure.is_some() {
                Vec::new()
            } else {
                state.sessions.pop_front().unwrap_or_default()
            };
            (failure, script)
        };
        let end_after_script = self.config.end_after_script;
        debug!(request = %request, steps = script.len(), "Simulated recognition");

        tokio::spawn(async move {
            if let Some(error) = failure {
                tokio::task::yield_now().await;
                events.errored(error);
                return;
            }

            events.started();
            for step in script {
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(step.delay_ms)) => {
                        events.result(step.transcript, step.is_final);
                    }
                    () = token.cancelled() => {
                        events.ended();
                        return;
                    }
                }
            }

            if !end_after_script {
                token.cancelled().await;
            }
            events.ended();
        });
        Ok(())
    }

    fn stop(&self) {
        if let Some(token) = self.lock().current.take() {
            token.cancel();
        }
    }
}
