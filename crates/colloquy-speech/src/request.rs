//! Requests as the coordinator tracks them.

use std::fmt;

use colloquy_core::{Priority, RequestId, RequestStatus, SpeechError, SpeechKind, SynthesisOptions};

type StartFn = Box<dyn FnMut() + Send>;
type EndFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(&SpeechError) + Send>;
type ResultFn = Box<dyn FnMut(&str, bool) + Send>;
type UtteranceFn = Box<dyn FnMut(&str) + Send>;

/// Per-request lifecycle callbacks.
///
/// Every callback runs on the coordinator task, so it must return quickly.
/// A request sees `on_start` at most once, and at most one of `on_end` or
/// `on_error`.
///
/// ```
/// use colloquy_speech::RequestCallbacks;
///
/// let callbacks = RequestCallbacks::new()
///     .on_start(|| println!("speaking"))
///     .on_end(|| println!("done"));
/// # drop(callbacks);
/// ```
#[derive(Default)]
pub struct RequestCallbacks {
    on_start: Option<StartFn>,
    on_end: Option<EndFn>,
    on_error: Option<ErrorFn>,
    on_result: Option<ResultFn>,
    on_utterance: Option<UtteranceFn>,
}

impl RequestCallbacks {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the request becomes active.
    #[must_use]
    pub fn on_start(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Called when the request completes or is cancelled while active.
    #[must_use]
    pub fn on_end(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    /// Called when the request fails.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&SpeechError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Called for every recognition result (`transcript`, `is_final`).
    #[must_use]
    pub fn on_result(mut self, f: impl FnMut(&str, bool) + Send + 'static) -> Self {
        self.on_result = Some(Box::new(f));
        self
    }

    /// Called once with the finalized utterance when a listening session
    /// hands over to `Processing`, right before `on_end`.
    #[must_use]
    pub fn on_utterance(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_utterance = Some(Box::new(f));
        self
    }

    pub(crate) fn fire_start(&mut self) {
        if let Some(f) = self.on_start.as_mut() {
            f();
        }
    }

    pub(crate) fn fire_end(&mut self) {
        if let Some(f) = self.on_end.as_mut() {
            f();
        }
    }

    pub(crate) fn fire_error(&mut self, error: &SpeechError) {
        if let Some(f) = self.on_error.as_mut() {
            f(error);
        }
    }

    pub(crate) fn fire_result(&mut self, transcript: &str, is_final: bool) {
        if let Some(f) = self.on_result.as_mut() {
            f(transcript, is_final);
        }
    }

    pub(crate) fn fire_utterance(&mut self, utterance: &str) {
        if let Some(f) = self.on_utterance.as_mut() {
            f(utterance);
        }
    }
}

impl fmt::Debug for RequestCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_result", &self.on_result.is_some())
            .field("on_utterance", &self.on_utterance.is_some())
            .finish()
    }
}

/// What a request asks the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechPayload {
    /// Speak `text`.
    Synthesis {
        text: String,
        options: SynthesisOptions,
    },
    /// Listen for an utterance.
    Recognition,
}

impl SpeechPayload {
    /// Kind of operation.
    pub const fn kind(&self) -> SpeechKind {
        match self {
            Self::Synthesis { .. } => SpeechKind::Synthesis,
            Self::Recognition => SpeechKind::Recognition,
        }
    }
}

/// A unit of work for the exclusive speech capability.
#[derive(Debug)]
pub struct SpeechRequest {
    id: RequestId,
    priority: Priority,
    payload: SpeechPayload,
    status: RequestStatus,
    callbacks: RequestCallbacks,
}

impl SpeechRequest {
    /// Create a request in the `Queued` status.
    pub fn new(
        id: RequestId,
        priority: Priority,
        payload: SpeechPayload,
        callbacks: RequestCallbacks,
    ) -> Self {
        Self {
            id,
            priority,
            payload,
            status: RequestStatus::Queued,
            callbacks,
        }
    }

    /// Shorthand for a synthesis request.
    pub fn synthesis(
        id: RequestId,
        priority: Priority,
        text: impl Into<String>,
        options: SynthesisOptions,
        callbacks: RequestCallbacks,
    ) -> Self {
        Self::new(
            id,
            priority,
            SpeechPayload::Synthesis {
                text: text.into(),
                options,
            },
            callbacks,
        )
    }

    /// Shorthand for a recognition request.
    pub fn recognition(id: RequestId, priority: Priority, callbacks: RequestCallbacks) -> Self {
        Self::new(id, priority, SpeechPayload::Recognition, callbacks)
    }

    pub const fn id(&self) -> RequestId {
        self.id
    }

    pub const fn priority(&self) -> Priority {
        self.priority
    }

    pub const fn kind(&self) -> SpeechKind {
        self.payload.kind()
    }

    pub const fn payload(&self) -> &SpeechPayload {
        &self.payload
    }

    pub const fn status(&self) -> RequestStatus {
        self.status
    }

    pub(crate) const fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }

    pub(crate) const fn callbacks_mut(&mut self) -> &mut RequestCallbacks {
        &mut self.callbacks
    }
}
