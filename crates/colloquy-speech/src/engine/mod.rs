//! Speech engine adapter port.
//!
//! The coordinator drives exactly one [`SpeechEngine`]. Engines are thin
//! wrappers over an external synthesis/recognition provider: they start an
//! operation, return immediately, and report progress through the
//! [`EngineEventSender`] they were handed for that operation.
//!
//! ## Event contract
//!
//! | Operation   | Events                                                   |
//! |-------------|----------------------------------------------------------|
//! | synthesize  | `Started`? then exactly one of `Ended` / `Errored`        |
//! | recognize   | `Started`? `Result`* then exactly one of `Ended` / `Errored` |
//!
//! After [`SpeechEngine::stop`] an engine may still deliver a late `Ended`
//! or `Errored`; the coordinator drops events for requests that no longer
//! hold the capability.

pub mod simulated;

use std::sync::Arc;

use colloquy_core::{RequestId, SpeechError, SynthesisOptions};
use tokio::sync::mpsc;

/// What the engine can do in this runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    pub synthesis: bool,
    pub recognition: bool,
}

impl EngineCapabilities {
    /// Both synthesis and recognition.
    pub const FULL: Self = Self {
        synthesis: true,
        recognition: true,
    };

    /// Neither operation (no speech capability present).
    pub const NONE: Self = Self {
        synthesis: false,
        recognition: false,
    };
}

/// A synthesis operation handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisJob {
    pub request: RequestId,
    pub text: String,
    pub options: SynthesisOptions,
}

/// Progress reported by an engine for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEventKind {
    /// Audio output or capture actually began.
    Started,
    /// A recognition hypothesis. Partial results may be revised later.
    Result { transcript: String, is_final: bool },
    /// The operation finished.
    Ended,
    /// The operation failed.
    Errored(SpeechError),
}

/// An engine event tagged with the request it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub request: RequestId,
    pub kind: EngineEventKind,
}

type EventSink = Arc<dyn Fn(EngineEvent) -> bool + Send + Sync>;

/// Sends events for a single operation back to the coordinator.
///
/// The request id is fixed at construction, so an engine cannot report
/// progress for an operation it was not given.
#[derive(Clone)]
pub struct EngineEventSender {
    request: RequestId,
    sink: EventSink,
}

impl std::fmt::Debug for EngineEventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineEventSender")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl EngineEventSender {
    /// Create a sender that tags every event with `request` and forwards it
    /// into `tx`.
    pub fn new(request: RequestId, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self::from_fn(request, move |event| tx.send(event).is_ok())
    }

    /// Create a sender backed by an arbitrary sink. The sink returns `false`
    /// once the receiving side is gone.
    pub fn from_fn<F>(request: RequestId, sink: F) -> Self
    where
        F: Fn(EngineEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            request,
            sink: Arc::new(sink),
        }
    }

    /// The request this sender reports for.
    pub const fn request(&self) -> RequestId {
        self.request
    }

    /// Report that the operation began.
    pub fn started(&self) {
        self.send(EngineEventKind::Started);
    }

    /// Report a recognition hypothesis.
    pub fn result(&self, transcript: impl Into<String>, is_final: bool) {
        self.send(EngineEventKind::Result {
            transcript: transcript.into(),
            is_final,
        });
    }

    /// Report that the operation finished.
    pub fn ended(&self) {
        self.send(EngineEventKind::Ended);
    }

    /// Report that the operation failed.
    pub fn errored(&self, error: SpeechError) {
        self.send(EngineEventKind::Errored(error));
    }

    fn send(&self, kind: EngineEventKind) {
        let event = EngineEvent {
            request: self.request,
            kind,
        };
        if !(self.sink)(event) {
            tracing::debug!(request = %self.request, "Coordinator gone, engine event dropped");
        }
    }
}

/// Backend-agnostic speech engine.
///
/// Implementations must be `Send + Sync`; the coordinator calls them from its
/// own task. Every method must return promptly: long-running work belongs on
/// the engine's own tasks or threads, reported through the event sender.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechEngine: Send + Sync {
    /// What this engine can do.
    fn capabilities(&self) -> EngineCapabilities;

    /// Begin speaking `job.text`.
    ///
    /// An `Err` means the operation never started; no events will follow.
    fn synthesize(&self, job: SynthesisJob, events: EngineEventSender) -> Result<(), SpeechError>;

    /// Begin recognizing speech for `request`.
    ///
    /// An `Err` means the operation never started; no events will follow.
    fn recognize(&self, request: RequestId, events: EngineEventSender) -> Result<(), SpeechError>;

    /// Stop the current operation. Best-effort; late events are allowed.
    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_tags_events_with_its_request() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = EngineEventSender::new(RequestId::new(4), tx);

        sender.started();
        sender.result("hi", false);
        sender.ended();

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.request == RequestId::new(4)));
        assert_eq!(
            events[1].kind,
            EngineEventKind::Result {
                transcript: "hi".to_string(),
                is_final: false
            }
        );
    }

    #[test]
    fn sender_survives_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sender = EngineEventSender::new(RequestId::new(1), tx);
        sender.errored(SpeechError::synthesis("late"));
    }
}
