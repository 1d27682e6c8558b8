//! Shared helpers for coordinator integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use colloquy_core::{
    ConversationState, CoordinatorSettings, CoordinatorSnapshot, RequestId, SpeechError,
};
use colloquy_speech::{
    EngineCapabilities, EngineEventSender, RequestCallbacks, SpeechCoordinator, SpeechEngine,
    SynthesisJob,
};

/// What the coordinator asked the engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Synthesize(RequestId, String),
    Recognize(RequestId),
    Stop,
}

/// Engine that records every call and lets the test emit events by hand.
#[derive(Debug)]
pub struct RecordingEngine {
    capabilities: EngineCapabilities,
    calls: Mutex<Vec<Call>>,
    senders: Mutex<HashMap<RequestId, EngineEventSender>>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::with_capabilities(EngineCapabilities::FULL)
    }
}

impl RecordingEngine {
    pub fn with_capabilities(capabilities: EngineCapabilities) -> Self {
        Self {
            capabilities,
            calls: Mutex::new(Vec::new()),
            senders: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == Call::Stop)
            .count()
    }

    /// Event sender the coordinator handed over for `id`.
    pub fn events(&self, id: RequestId) -> EngineEventSender {
        self.senders
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| panic!("engine never received {id}"))
    }
}

impl SpeechEngine for RecordingEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    fn synthesize(&self, job: SynthesisJob, events: EngineEventSender) -> Result<(), SpeechError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Synthesize(job.request, job.text));
        self.senders.lock().unwrap().insert(job.request, events);
        Ok(())
    }

    fn recognize(&self, request: RequestId, events: EngineEventSender) -> Result<(), SpeechError> {
        self.calls.lock().unwrap().push(Call::Recognize(request));
        self.senders.lock().unwrap().insert(request, events);
        Ok(())
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push(Call::Stop);
    }
}

/// Shared, ordered log of callback invocations.
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Callbacks that log `<label>:start`, `<label>:end`, `<label>:error:<kind>`
    /// and `<label>:result:<text>`.
    pub fn callbacks(&self, label: &str) -> RequestCallbacks {
        let (start, end, error, result) = (self.clone(), self.clone(), self.clone(), self.clone());
        let (l1, l2, l3, l4) = (
            label.to_string(),
            label.to_string(),
            label.to_string(),
            label.to_string(),
        );
        RequestCallbacks::new()
            .on_start(move || start.push(format!("{l1}:start")))
            .on_end(move || end.push(format!("{l2}:end")))
            .on_error(move |e| error.push(format!("{l3}:error:{}", e.kind_label())))
            .on_result(move |text, _| result.push(format!("{l4}:result:{text}")))
    }
}

/// Defaults with turn-taking off, so tests control every dispatch.
pub fn manual_settings() -> CoordinatorSettings {
    CoordinatorSettings {
        turn_taking: Some(false),
        ..CoordinatorSettings::with_defaults()
    }
}

pub fn spawn(engine: &Arc<RecordingEngine>, settings: CoordinatorSettings) -> SpeechCoordinator {
    let engine: Arc<dyn SpeechEngine> = engine.clone();
    SpeechCoordinator::spawn(engine, settings).expect("valid settings")
}

/// Record the conversation state of every snapshot the coordinator publishes.
pub fn record_states(coordinator: &SpeechCoordinator) -> Arc<Mutex<Vec<ConversationState>>> {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    coordinator
        .on_state_change(Arc::new(move |snapshot: &CoordinatorSnapshot| {
            sink.lock().unwrap().push(snapshot.conversation);
        }))
        .expect("coordinator running");
    states
}

/// Record every snapshot the coordinator publishes.
pub fn record_snapshots(coordinator: &SpeechCoordinator) -> Arc<Mutex<Vec<CoordinatorSnapshot>>> {
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshots);
    coordinator
        .on_state_change(Arc::new(move |snapshot: &CoordinatorSnapshot| {
            sink.lock().unwrap().push(snapshot.clone());
        }))
        .expect("coordinator running");
    snapshots
}
