//! The speech coordinator handle.
//!
//! [`SpeechCoordinator`] is a cheap, cloneable proxy. Every call becomes a
//! [`Message`] for the single actor task that owns the queue, the resource
//! mutex, the conversation state and the engine. Engine events travel on the
//! same channel, so all state changes happen in one serialized order and a
//! reply to any call reflects everything sent before it.

mod actor;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use colloquy_core::{
    CoordinatorSettings, CoordinatorSnapshot, Priority, RequestId, RequestStatus, SettingsError,
    SettingsUpdate, SpeechError, SpeechKind, StateObserver, SynthesisOptions, validate_settings,
};
use tokio::sync::{mpsc, oneshot, watch};

use crate::engine::{EngineEvent, SpeechEngine};
use crate::error::CoordinatorError;
use crate::request::{RequestCallbacks, SpeechPayload};

use actor::CoordinatorActor;

/// Identifies a state observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ── Messages ───────────────────────────────────────────────────────

/// Everything the actor reacts to, except its own timers.
pub(crate) enum Message {
    /// Progress from the engine for some request.
    Engine(EngineEvent),

    Submit {
        payload: SpeechPayload,
        callbacks: RequestCallbacks,
        priority: Option<Priority>,
        reply: oneshot::Sender<Result<RequestId, SpeechError>>,
    },

    /// Stop the active request if it is of `kind`.
    Stop {
        kind: SpeechKind,
        reply: oneshot::Sender<bool>,
    },

    StopAll { reply: oneshot::Sender<()> },

    ForceReset { reply: oneshot::Sender<()> },

    Cancel {
        id: RequestId,
        reply: oneshot::Sender<bool>,
    },

    ClearQueue { reply: oneshot::Sender<usize> },

    Subscribe {
        id: SubscriptionId,
        observer: Arc<dyn StateObserver>,
    },

    Unsubscribe {
        id: SubscriptionId,
        reply: oneshot::Sender<bool>,
    },

    Snapshot {
        reply: oneshot::Sender<CoordinatorSnapshot>,
    },

    Status {
        id: RequestId,
        reply: oneshot::Sender<Option<RequestStatus>>,
    },

    UpdateSettings {
        update: SettingsUpdate,
        reply: oneshot::Sender<Result<(), SettingsError>>,
    },

    /// Stop everything and end the actor task.
    Shutdown { reply: oneshot::Sender<()> },
}

// ── Handle ─────────────────────────────────────────────────────────

/// Handle to a running speech coordinator.
///
/// Construct one per application with [`SpeechCoordinator::spawn`] and pass
/// clones to whoever needs speech. The actor task ends on
/// [`shutdown`](Self::shutdown) or once every handle is dropped.
#[derive(Clone)]
pub struct SpeechCoordinator {
    inbox: mpsc::UnboundedSender<Message>,
    snapshots: watch::Receiver<CoordinatorSnapshot>,
    next_subscription: Arc<AtomicU64>,
}

impl fmt::Debug for SpeechCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechCoordinator")
            .field("closed", &self.inbox.is_closed())
            .finish_non_exhaustive()
    }
}

impl SpeechCoordinator {
    /// Validate `settings` and start the coordinator task on the current
    /// tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        engine: Arc<dyn SpeechEngine>,
        settings: CoordinatorSettings,
    ) -> Result<Self, SettingsError> {
        validate_settings(&settings)?;

        let (inbox, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(CoordinatorSnapshot::default());
        let actor = CoordinatorActor::new(engine, settings, rx, inbox.downgrade(), snapshot_tx);
        tokio::spawn(actor.run());

        Ok(Self {
            inbox,
            snapshots,
            next_subscription: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Ask for `text` to be spoken.
    ///
    /// Resolves once the request is admitted (started or queued), not when
    /// it finishes; completion is reported through `callbacks`. `None`
    /// priority uses the configured default.
    pub async fn speak(
        &self,
        text: impl Into<String>,
        options: SynthesisOptions,
        callbacks: RequestCallbacks,
        priority: Option<Priority>,
    ) -> Result<RequestId, CoordinatorError> {
        let payload = SpeechPayload::Synthesis {
            text: text.into(),
            options,
        };
        self.submit(payload, callbacks, priority).await
    }

    /// Ask to listen for one utterance. See [`speak`](Self::speak).
    pub async fn listen(
        &self,
        callbacks: RequestCallbacks,
        priority: Option<Priority>,
    ) -> Result<RequestId, CoordinatorError> {
        self.submit(SpeechPayload::Recognition, callbacks, priority)
            .await
    }

    /// Stop the active synthesis. Returns whether one was active.
    pub async fn stop_speaking(&self) -> Result<bool, CoordinatorError> {
        self.request(|reply| Message::Stop {
            kind: SpeechKind::Synthesis,
            reply,
        })
        .await
    }

    /// Stop the active recognition. Returns whether one was active.
    pub async fn stop_listening(&self) -> Result<bool, CoordinatorError> {
        self.request(|reply| Message::Stop {
            kind: SpeechKind::Recognition,
            reply,
        })
        .await
    }

    /// Stop the active request, drop the queue and return to `Idle`.
    pub async fn stop_all(&self) -> Result<(), CoordinatorError> {
        self.request(|reply| Message::StopAll { reply }).await
    }

    /// Like [`stop_all`](Self::stop_all), and also forget the last error and
    /// the recovery counter.
    pub async fn force_reset(&self) -> Result<(), CoordinatorError> {
        self.request(|reply| Message::ForceReset { reply }).await
    }

    /// Cancel a queued or active request. `false` if it is unknown or
    /// already finished.
    pub async fn cancel_request(&self, id: RequestId) -> Result<bool, CoordinatorError> {
        self.request(|reply| Message::Cancel { id, reply }).await
    }

    /// Drop every queued request. Returns how many were dropped.
    pub async fn clear_queue(&self) -> Result<usize, CoordinatorError> {
        self.request(|reply| Message::ClearQueue { reply }).await
    }

    /// Register an observer. It immediately receives the current snapshot,
    /// then one per observable change.
    pub fn on_state_change(
        &self,
        observer: Arc<dyn StateObserver>,
    ) -> Result<SubscriptionId, CoordinatorError> {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inbox
            .send(Message::Subscribe { id, observer })
            .map_err(|_| CoordinatorError::Closed)?;
        Ok(id)
    }

    /// Remove an observer. Returns whether it was registered.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, CoordinatorError> {
        self.request(|reply| Message::Unsubscribe { id, reply })
            .await
    }

    /// Stream of the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<CoordinatorSnapshot> {
        self.snapshots.clone()
    }

    /// Current snapshot, after every previously sent call has been handled.
    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot, CoordinatorError> {
        self.request(|reply| Message::Snapshot { reply }).await
    }

    /// Status of a request: `Queued`, `Active`, or its terminal status if it
    /// finished recently.
    pub async fn status(&self, id: RequestId) -> Result<Option<RequestStatus>, CoordinatorError> {
        self.request(|reply| Message::Status { id, reply }).await
    }

    /// Validate and apply a partial settings update.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<(), CoordinatorError> {
        self.request(|reply| Message::UpdateSettings { update, reply })
            .await?
            .map_err(CoordinatorError::from)
    }

    /// Stop everything and end the coordinator task.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.request(|reply| Message::Shutdown { reply }).await
    }

    /// Whether the coordinator task has stopped.
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    // ── Internal helpers ───────────────────────────────────────────

    async fn submit(
        &self,
        payload: SpeechPayload,
        callbacks: RequestCallbacks,
        priority: Option<Priority>,
    ) -> Result<RequestId, CoordinatorError> {
        self.request(|reply| Message::Submit {
            payload,
            callbacks,
            priority,
            reply,
        })
        .await?
        .map_err(CoordinatorError::Rejected)
    }

    /// Send a message carrying a one-shot reply channel and wait for the
    /// actor's answer. A dead actor maps to [`CoordinatorError::Closed`].
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Message,
    ) -> Result<T, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(build(tx))
            .map_err(|_| CoordinatorError::Closed)?;
        rx.await.map_err(|_| CoordinatorError::Closed)
    }
}
