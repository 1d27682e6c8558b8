//! The coordinator's single consumer task.
//!
//! Owns every piece of mutable state. Reacts to handle calls, engine events
//! and two timers (silence endpointing and the turn-taking restart), one at
//! a time.
//!
//! At most one request is active: `active` and `resource` always agree on
//! who that is. The conversation state follows the active operation:
//! `Listening` only with an active recognition, `AiSpeaking` only with an
//! active synthesis, `Processing` with nothing active.

use std::collections::VecDeque;
use std::sync::Arc;

use colloquy_core::{
    ConversationEvent, ConversationState, CoordinatorSettings, CoordinatorSnapshot, Priority,
    RequestId, RequestStatus, SettingsError, SettingsUpdate, SpeechError, SpeechKind,
    StateObserver, StopBehavior, validate_settings,
};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{Message, SubscriptionId};
use crate::endpoint::SilenceTimer;
use crate::engine::{EngineEvent, EngineEventKind, EngineEventSender, SpeechEngine, SynthesisJob};
use crate::queue::RequestQueue;
use crate::request::{RequestCallbacks, SpeechPayload, SpeechRequest};
use crate::resource::{Acquisition, Holder, ResourceMutex};

/// Terminal statuses kept for `status()` lookups.
const STATUS_HISTORY: usize = 64;

pub(super) struct CoordinatorActor {
    engine: Arc<dyn SpeechEngine>,
    settings: CoordinatorSettings,
    queue: RequestQueue,
    resource: ResourceMutex,
    active: Option<SpeechRequest>,
    conversation: ConversationState,
    endpoint: SilenceTimer,
    /// Utterance handed over while `Processing`.
    utterance: Option<String>,
    restart_at: Option<Instant>,
    last_error: Option<SpeechError>,
    consecutive_failures: u32,
    next_request: u64,
    history: VecDeque<(RequestId, RequestStatus)>,
    observers: Vec<(SubscriptionId, Arc<dyn StateObserver>)>,
    inbox: mpsc::UnboundedReceiver<Message>,
    events: mpsc::WeakUnboundedSender<Message>,
    snapshots: watch::Sender<CoordinatorSnapshot>,
}

impl CoordinatorActor {
    pub(super) fn new(
        engine: Arc<dyn SpeechEngine>,
        settings: CoordinatorSettings,
        inbox: mpsc::UnboundedReceiver<Message>,
        events: mpsc::WeakUnboundedSender<Message>,
        snapshots: watch::Sender<CoordinatorSnapshot>,
    ) -> Self {
        Self {
            engine,
            queue: RequestQueue::new(settings.effective_max_queue_size()),
            endpoint: SilenceTimer::new(settings.silence_timeout()),
            settings,
            resource: ResourceMutex::new(),
            active: None,
            conversation: ConversationState::Idle,
            utterance: None,
            restart_at: None,
            last_error: None,
            consecutive_failures: 0,
            next_request: 1,
            history: VecDeque::with_capacity(STATUS_HISTORY),
            observers: Vec::new(),
            inbox,
            events,
            snapshots,
        }
    }

    pub(super) async fn run(mut self) {
        info!("Speech coordinator started");
        loop {
            let silence = self.endpoint.deadline();
            let restart = self.restart_at;

            tokio::select! {
                biased;
                message = self.inbox.recv() => match message {
                    Some(Message::Shutdown { reply }) => {
                        self.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(message) => self.handle(message),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                () = wait_until(silence) => self.on_silence_elapsed(),
                () = wait_until(restart) => self.on_restart_due(),
            }
        }
        info!("Speech coordinator stopped");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Engine(event) => self.on_engine_event(event),
            Message::Submit {
                payload,
                callbacks,
                priority,
                reply,
            } => {
                let _ = reply.send(self.submit(payload, callbacks, priority));
            }
            Message::Stop { kind, reply } => {
                let _ = reply.send(self.stop(kind));
            }
            Message::StopAll { reply } => {
                self.stop_all();
                let _ = reply.send(());
            }
            Message::ForceReset { reply } => {
                self.force_reset();
                let _ = reply.send(());
            }
            Message::Cancel { id, reply } => {
                let _ = reply.send(self.cancel(id));
            }
            Message::ClearQueue { reply } => {
                let _ = reply.send(self.clear_queue());
            }
            Message::Subscribe { id, observer } => {
                observer.on_state_change(&self.snapshot());
                self.observers.push((id, observer));
                debug!(subscription = %id, "State observer registered");
            }
            Message::Unsubscribe { id, reply } => {
                let before = self.observers.len();
                self.observers.retain(|(sub, _)| *sub != id);
                let _ = reply.send(self.observers.len() != before);
            }
            Message::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Message::Status { id, reply } => {
                let _ = reply.send(self.status(id));
            }
            Message::UpdateSettings { update, reply } => {
                let _ = reply.send(self.update_settings(&update));
            }
            // Intercepted by `run`.
            Message::Shutdown { reply } => {
                self.shutdown();
                let _ = reply.send(());
            }
        }
    }

    // ── Admission and dispatch ─────────────────────────────────────

    fn submit(
        &mut self,
        payload: SpeechPayload,
        callbacks: RequestCallbacks,
        priority: Option<Priority>,
    ) -> Result<RequestId, SpeechError> {
        if let SpeechPayload::Synthesis { text, .. } = &payload {
            if text.trim().is_empty() {
                warn!("Rejected synthesis request with empty text");
                return Err(SpeechError::invalid("Cannot speak empty text"));
            }
        }
        if let Err(error) = self.queue.check_capacity() {
            warn!(
                queued = self.queue.len(),
                max = self.queue.max_size(),
                "Rejected request, queue is full"
            );
            return Err(error);
        }

        let id = RequestId::new(self.next_request);
        self.next_request += 1;
        let priority = priority.unwrap_or_else(|| self.settings.effective_default_priority());
        let request = SpeechRequest::new(id, priority, payload, callbacks);

        // New caller activity supersedes a pending automatic restart.
        self.restart_at = None;
        self.dispatch(request);
        self.drain();
        self.publish();
        Ok(id)
    }

    /// Start `request` now, preempting if it outranks the holder, or queue it.
    fn dispatch(&mut self, request: SpeechRequest) {
        let candidate = Holder {
            id: request.id(),
            kind: request.kind(),
            priority: request.priority(),
        };

        match self.resource.try_acquire(candidate) {
            Acquisition::Granted => self.start(request),
            Acquisition::Preempted(previous) => {
                self.preempt(previous);
                self.start(request);
            }
            Acquisition::Busy(holder) => {
                let id = request.id();
                match self.queue.enqueue(request) {
                    Ok(position) => debug!(
                        request = %id,
                        holder = %holder.id,
                        position,
                        "Speech capability busy, request queued"
                    ),
                    Err(error) => warn!(request = %id, %error, "Dropped request"),
                }
            }
        }
    }

    /// Dispatch queued requests while the capability is free.
    fn drain(&mut self) {
        while self.resource.holder().is_none() {
            let Some(request) = self.queue.dequeue_next() else {
                break;
            };
            self.dispatch(request);
        }
    }

    /// Hand a request that already holds the mutex to the engine.
    fn start(&mut self, mut request: SpeechRequest) {
        let id = request.id();
        let kind = request.kind();
        let capabilities = self.engine.capabilities();
        let available = match kind {
            SpeechKind::Synthesis => capabilities.synthesis,
            SpeechKind::Recognition => capabilities.recognition,
        };
        if !available {
            let error = SpeechError::unavailable(format!("Engine offers no {kind:?}"));
            self.fail_dispatch(request, error);
            return;
        }

        let events = self.event_sender(id);
        let started = match request.payload() {
            SpeechPayload::Synthesis { text, options } => {
                let job = SynthesisJob {
                    request: id,
                    text: text.clone(),
                    options: options.clamped(),
                };
                self.engine.synthesize(job, events)
            }
            SpeechPayload::Recognition => self.engine.recognize(id, events),
        };
        if let Err(error) = started {
            self.fail_dispatch(request, error);
            return;
        }

        info!(
            request = %id,
            kind = ?kind,
            priority = %request.priority(),
            "Dispatched speech request"
        );
        request.set_status(RequestStatus::Active);
        request.callbacks_mut().fire_start();
        self.active = Some(request);

        match kind {
            SpeechKind::Synthesis => self.transition(&ConversationEvent::AiResponseReady),
            SpeechKind::Recognition => {
                self.endpoint.reset();
                self.transition(&ConversationEvent::StartListening {
                    recognition_available: capabilities.recognition,
                });
            }
        }
    }

    /// The engine refused to start `request`.
    fn fail_dispatch(&mut self, mut request: SpeechRequest, error: SpeechError) {
        warn!(request = %request.id(), %error, "Speech engine refused request");
        self.resource.release(request.id());
        request.set_status(RequestStatus::Failed);
        self.record(request.id(), RequestStatus::Failed);
        request.callbacks_mut().fire_error(&error);
        self.raise_error(error);
    }

    /// Stop the displaced holder. The mutex already belongs to the newcomer.
    fn preempt(&mut self, previous: Holder) {
        info!(request = %previous.id, kind = ?previous.kind, "Preempting active request");
        self.engine.stop();
        self.end_active(RequestStatus::Cancelled);
        if previous.kind == SpeechKind::Recognition {
            self.endpoint.reset();
        }
        self.transition(&ConversationEvent::Interrupted);
    }

    // ── Engine events ──────────────────────────────────────────────

    fn on_engine_event(&mut self, event: EngineEvent) {
        if !self.resource.is_held_by(event.request) {
            debug!(request = %event.request, kind = ?event.kind, "Ignoring stale engine event");
            return;
        }
        let Some(kind) = self.active.as_ref().map(SpeechRequest::kind) else {
            return;
        };

        match (event.kind, kind) {
            (EngineEventKind::Started, _) => {
                debug!(request = %event.request, "Engine started");
            }
            (EngineEventKind::Result { transcript, is_final }, SpeechKind::Recognition) => {
                self.on_result(&transcript, is_final);
            }
            (EngineEventKind::Result { .. }, SpeechKind::Synthesis) => {
                debug!(request = %event.request, "Ignoring recognition result during synthesis");
            }
            (EngineEventKind::Ended, SpeechKind::Synthesis) => self.finish_synthesis(),
            (EngineEventKind::Ended, SpeechKind::Recognition) => self.finalize_listening(false),
            (EngineEventKind::Errored(error), _) => self.on_engine_error(error, kind),
        }
    }

    fn on_result(&mut self, transcript: &str, is_final: bool) {
        if let Some(request) = self.active.as_mut() {
            request.callbacks_mut().fire_result(transcript, is_final);
        }
        let deadline = self.endpoint.record(transcript, is_final, Instant::now());
        debug!(is_final, ?deadline, "Recognition result, silence timer armed");
        self.publish();
    }

    /// Synthesis ran to its natural end.
    fn finish_synthesis(&mut self) {
        self.end_active(RequestStatus::Completed);
        self.consecutive_failures = 0;

        let was_speaking = self.conversation == ConversationState::AiSpeaking;
        self.transition(&ConversationEvent::SpeechEnded);

        if was_speaking
            && self.conversation == ConversationState::Idle
            && self.settings.turn_taking_enabled()
            && self.queue.is_empty()
        {
            let delay = self.settings.auto_restart_delay();
            debug!(?delay, "Turn-taking restart scheduled");
            self.restart_at = Some(Instant::now() + delay);
        }

        self.drain();
        self.publish();
    }

    /// Close the listening session and hand over what was heard.
    fn finalize_listening(&mut self, stop_engine: bool) {
        if stop_engine {
            self.engine.stop();
        }
        let transcript = self.endpoint.take_transcript();
        info!(chars = transcript.len(), "Utterance finalized");
        self.end_listening(Some(&transcript));
        self.consecutive_failures = 0;

        self.transition(&ConversationEvent::FinalTranscriptReady {
            transcript: transcript.clone(),
        });
        self.hand_over(transcript);
    }

    /// Complete the active recognition, delivering a non-blank `utterance`
    /// right before `on_end`.
    fn end_listening(&mut self, utterance: Option<&str>) {
        if let Some(mut request) = self.take_active(RequestStatus::Completed) {
            if let Some(utterance) = utterance.filter(|u| !u.is_empty()) {
                request.callbacks_mut().fire_utterance(utterance);
            }
            request.callbacks_mut().fire_end();
        }
    }

    /// Publish `Processing` with its utterance before anything queued takes
    /// the capability and moves the conversation on.
    fn hand_over(&mut self, transcript: String) {
        if self.conversation == ConversationState::Processing {
            self.utterance = Some(transcript);
            self.publish();
        }

        self.drain();
        self.publish();
    }

    fn on_engine_error(&mut self, error: SpeechError, kind: SpeechKind) {
        if kind == SpeechKind::Recognition && error.is_silence() {
            debug!(%error, "Silence reported, finalizing utterance");
            self.finalize_listening(false);
            return;
        }

        warn!(%error, kind = ?kind, "Speech engine reported an error");
        if kind == SpeechKind::Recognition {
            self.endpoint.reset();
        }
        if let Some(mut request) = self.take_active(RequestStatus::Failed) {
            request.callbacks_mut().fire_error(&error);
        }
        self.raise_error(error);
        self.drain();
        self.publish();
    }

    /// Record `error`, enter `Error`, and recover automatically when allowed.
    fn raise_error(&mut self, error: SpeechError) {
        let hard = error.is_hard();
        self.last_error = Some(error);
        self.restart_at = None;
        self.transition(&ConversationEvent::ErrorRaised);
        self.publish();

        if hard {
            warn!("Speech capability unusable, staying in error state until reset");
            return;
        }
        if self.consecutive_failures >= self.settings.effective_max_auto_recoveries() {
            warn!(
                failures = self.consecutive_failures,
                "Automatic recovery budget exhausted, staying in error state until reset"
            );
            return;
        }

        self.consecutive_failures += 1;
        info!(attempt = self.consecutive_failures, "Recovering from speech error");
        self.transition(&ConversationEvent::Reset);
        self.publish();
    }

    // ── Timers ─────────────────────────────────────────────────────

    fn on_silence_elapsed(&mut self) {
        let listening = self
            .active
            .as_ref()
            .is_some_and(|r| r.kind() == SpeechKind::Recognition);
        if listening {
            debug!("Silence timeout elapsed");
            self.finalize_listening(true);
        } else {
            self.endpoint.reset();
        }
    }

    fn on_restart_due(&mut self) {
        self.restart_at = None;
        let quiet = self.active.is_none()
            && self.queue.is_empty()
            && self.conversation == ConversationState::Idle;
        if !quiet || !self.settings.turn_taking_enabled() {
            return;
        }

        info!("Turn-taking: listening again");
        if let Err(error) = self.submit(SpeechPayload::Recognition, RequestCallbacks::new(), None) {
            warn!(%error, "Automatic listen was rejected");
        }
    }

    // ── Stop / cancel / reset ──────────────────────────────────────

    fn stop(&mut self, kind: SpeechKind) -> bool {
        if kind == SpeechKind::Recognition {
            self.restart_at = None;
        }
        if self.active.as_ref().map(SpeechRequest::kind) != Some(kind) {
            return false;
        }

        info!(kind = ?kind, "Stopping active request");
        self.engine.stop();

        match kind {
            SpeechKind::Synthesis => {
                self.end_active(RequestStatus::Completed);
                self.transition(&ConversationEvent::SpeechEnded);
                self.drain();
                self.publish();
            }
            SpeechKind::Recognition => {
                let transcript = self.endpoint.take_transcript();
                let finalize = self.settings.effective_stop_behavior() == StopBehavior::Finalize
                    && !transcript.is_empty();
                self.end_listening(finalize.then_some(transcript.as_str()));
                self.transition(&ConversationEvent::ManualStop { finalize });
                self.hand_over(transcript);
            }
        }
        true
    }

    fn cancel(&mut self, id: RequestId) -> bool {
        if let Some(mut request) = self.queue.remove(id) {
            info!(request = %id, "Cancelled queued request");
            request.set_status(RequestStatus::Cancelled);
            self.record(id, RequestStatus::Cancelled);
            self.publish();
            return true;
        }

        match self.active.as_ref() {
            Some(request) if request.id() == id => {
                let kind = request.kind();
                self.stop(kind)
            }
            _ => false,
        }
    }

    fn clear_queue(&mut self) -> usize {
        let cleared = self.queue.clear();
        for request in &cleared {
            self.record(request.id(), RequestStatus::Cancelled);
        }
        if !cleared.is_empty() {
            info!(count = cleared.len(), "Cleared speech queue");
            self.publish();
        }
        cleared.len()
    }

    fn stop_all(&mut self) {
        self.halt();
        self.publish();
    }

    fn force_reset(&mut self) {
        info!("Force reset");
        self.halt();
        self.last_error = None;
        self.consecutive_failures = 0;
        self.publish();
    }

    fn shutdown(&mut self) {
        self.halt();
        self.publish();
        self.observers.clear();
    }

    /// Stop the active request, drop the queue and return to `Idle`.
    fn halt(&mut self) {
        self.restart_at = None;
        if let Some(holder) = self.resource.force_release() {
            info!(request = %holder.id, kind = ?holder.kind, "Halting active request");
            self.engine.stop();
            self.end_active(RequestStatus::Cancelled);
        }
        self.clear_queue();
        self.endpoint.reset();
        self.transition(&ConversationEvent::Reset);
    }

    fn update_settings(&mut self, update: &SettingsUpdate) -> Result<(), SettingsError> {
        let mut next = self.settings.clone();
        next.merge(update);
        validate_settings(&next)?;

        self.endpoint.set_timeout(next.silence_timeout());
        self.queue.set_max_size(next.effective_max_queue_size());
        if !next.turn_taking_enabled() {
            self.restart_at = None;
        }
        self.settings = next;
        info!(
            silence_timeout = ?self.endpoint.timeout(),
            max_queue = self.queue.max_size(),
            "Coordinator settings updated"
        );
        Ok(())
    }

    // ── Bookkeeping ────────────────────────────────────────────────

    /// Finish the active request with `status`, firing `on_end`.
    fn end_active(&mut self, status: RequestStatus) {
        if let Some(mut request) = self.take_active(status) {
            request.callbacks_mut().fire_end();
        }
    }

    /// Detach the active request, release the mutex and record `status`.
    ///
    /// The mutex release is a no-op after preemption, where ownership has
    /// already moved to the newcomer, and after `halt`.
    fn take_active(&mut self, status: RequestStatus) -> Option<SpeechRequest> {
        let mut request = self.active.take()?;
        self.resource.release(request.id());
        request.set_status(status);
        self.record(request.id(), status);
        debug!(request = %request.id(), status = ?status, "Request finished");
        Some(request)
    }

    fn record(&mut self, id: RequestId, status: RequestStatus) {
        if self.history.len() == STATUS_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back((id, status));
    }

    fn status(&self, id: RequestId) -> Option<RequestStatus> {
        if self.active.as_ref().is_some_and(|r| r.id() == id) {
            return Some(RequestStatus::Active);
        }
        if self.queue.contains(id) {
            return Some(RequestStatus::Queued);
        }
        self.history
            .iter()
            .rev()
            .find(|(recorded, _)| *recorded == id)
            .map(|(_, status)| *status)
    }

    fn transition(&mut self, event: &ConversationEvent) {
        match self.conversation.apply(event) {
            Ok(next) => {
                if next != self.conversation {
                    debug!(
                        old = ?self.conversation,
                        new = ?next,
                        event = event.name(),
                        "Conversation state transition"
                    );
                }
                self.conversation = next;
                if next != ConversationState::Processing {
                    self.utterance = None;
                }
            }
            Err(error) => debug!(%error, "Conversation event ignored"),
        }
    }

    fn event_sender(&self, id: RequestId) -> EngineEventSender {
        let inbox = self.events.clone();
        EngineEventSender::from_fn(id, move |event| {
            inbox
                .upgrade()
                .is_some_and(|tx| tx.send(Message::Engine(event)).is_ok())
        })
    }

    fn snapshot(&self) -> CoordinatorSnapshot {
        let transcript = match self.conversation {
            ConversationState::Listening => self.endpoint.pending_transcript(),
            ConversationState::Processing => self.utterance.clone(),
            _ => None,
        };

        CoordinatorSnapshot {
            operation: self.resource.current_operation(),
            active_request: self.resource.holder().map(|h| h.id),
            queue_length: self.queue.len(),
            queued_by_priority: self.queue.tier_counts(),
            conversation: self.conversation,
            transcript,
            last_error: self.last_error.clone(),
            consecutive_failures: self.consecutive_failures,
        }
    }

    /// Push the current snapshot to the watch channel and, if it changed,
    /// to every observer.
    fn publish(&self) {
        let snapshot = self.snapshot();
        let changed = self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                current.clone_from(&snapshot);
                true
            }
        });
        if changed {
            for (_, observer) in &self.observers {
                observer.on_state_change(&snapshot);
            }
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpeechCoordinator;
    use crate::engine::{EngineCapabilities, MockSpeechEngine};
    use colloquy_core::{OperationKind, SynthesisOptions};
    use std::sync::Mutex;

    type Senders = Arc<Mutex<Vec<EngineEventSender>>>;

    /// A mock engine that accepts every request and keeps its event senders.
    fn accepting_engine(stops: usize) -> (MockSpeechEngine, Senders) {
        let senders: Senders = Arc::new(Mutex::new(Vec::new()));
        let mut engine = MockSpeechEngine::new();
        engine
            .expect_capabilities()
            .return_const(EngineCapabilities::FULL);
        let synth = Arc::clone(&senders);
        engine.expect_synthesize().returning(move |_, events| {
            synth.lock().unwrap().push(events);
            Ok(())
        });
        let recog = Arc::clone(&senders);
        engine.expect_recognize().returning(move |_, events| {
            recog.lock().unwrap().push(events);
            Ok(())
        });
        engine.expect_stop().times(stops).return_const(());
        (engine, senders)
    }

    fn quiet_settings() -> CoordinatorSettings {
        CoordinatorSettings {
            turn_taking: Some(false),
            ..CoordinatorSettings::with_defaults()
        }
    }

    #[tokio::test]
    async fn preemption_stops_engine_once() {
        let (engine, _senders) = accepting_engine(1);
        let coordinator = SpeechCoordinator::spawn(Arc::new(engine), quiet_settings()).unwrap();

        let low = coordinator
            .speak(
                "background",
                SynthesisOptions::default(),
                RequestCallbacks::new(),
                Some(Priority::Low),
            )
            .await
            .unwrap();
        let high = coordinator
            .speak(
                "urgent",
                SynthesisOptions::default(),
                RequestCallbacks::new(),
                Some(Priority::High),
            )
            .await
            .unwrap();

        assert_eq!(coordinator.status(low).await.unwrap(), Some(RequestStatus::Cancelled));
        assert_eq!(coordinator.status(high).await.unwrap(), Some(RequestStatus::Active));
        let snapshot = coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.active_request, Some(high));
        assert_eq!(snapshot.conversation, ConversationState::AiSpeaking);
    }

    #[tokio::test]
    async fn equal_priority_never_touches_engine_stop() {
        let (engine, senders) = accepting_engine(0);
        let coordinator = SpeechCoordinator::spawn(Arc::new(engine), quiet_settings()).unwrap();

        let first = coordinator
            .speak("one", SynthesisOptions::default(), RequestCallbacks::new(), None)
            .await
            .unwrap();
        let second = coordinator
            .speak("two", SynthesisOptions::default(), RequestCallbacks::new(), None)
            .await
            .unwrap();
        assert_eq!(coordinator.status(second).await.unwrap(), Some(RequestStatus::Queued));

        senders.lock().unwrap()[0].ended();
        assert_eq!(coordinator.status(first).await.unwrap(), Some(RequestStatus::Completed));
        assert_eq!(coordinator.status(second).await.unwrap(), Some(RequestStatus::Active));
    }

    #[tokio::test]
    async fn stop_speaking_calls_engine_stop() {
        let (engine, _senders) = accepting_engine(1);
        let coordinator = SpeechCoordinator::spawn(Arc::new(engine), quiet_settings()).unwrap();

        let id = coordinator
            .speak("hello", SynthesisOptions::default(), RequestCallbacks::new(), None)
            .await
            .unwrap();
        assert!(coordinator.stop_speaking().await.unwrap());
        assert!(!coordinator.stop_speaking().await.unwrap());

        assert_eq!(coordinator.status(id).await.unwrap(), Some(RequestStatus::Completed));
        let snapshot = coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.operation, OperationKind::Idle);
        assert_eq!(snapshot.conversation, ConversationState::Idle);
    }

    #[tokio::test]
    async fn engine_refusal_fails_request_and_recovers() {
        let mut engine = MockSpeechEngine::new();
        engine
            .expect_capabilities()
            .return_const(EngineCapabilities::FULL);
        engine
            .expect_synthesize()
            .times(1)
            .returning(|_, _| Err(SpeechError::synthesis("audio device busy")));
        engine.expect_stop().never();

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let coordinator = SpeechCoordinator::spawn(Arc::new(engine), quiet_settings()).unwrap();
        let id = coordinator
            .speak(
                "hello",
                SynthesisOptions::default(),
                RequestCallbacks::new().on_error(move |e| sink.lock().unwrap().push(e.clone())),
                None,
            )
            .await
            .unwrap();

        assert_eq!(coordinator.status(id).await.unwrap(), Some(RequestStatus::Failed));
        assert_eq!(errors.lock().unwrap().len(), 1);
        let snapshot = coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.conversation, ConversationState::Idle);
        assert_eq!(snapshot.consecutive_failures, 1);
        assert!(matches!(
            snapshot.last_error,
            Some(SpeechError::SynthesisFailure { .. })
        ));
    }

    #[tokio::test]
    async fn missing_capability_is_hard_error() {
        let mut engine = MockSpeechEngine::new();
        engine
            .expect_capabilities()
            .return_const(EngineCapabilities::NONE);
        engine.expect_recognize().never();
        engine.expect_stop().return_const(());

        let coordinator = SpeechCoordinator::spawn(Arc::new(engine), quiet_settings()).unwrap();
        coordinator.listen(RequestCallbacks::new(), None).await.unwrap();

        let snapshot = coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.conversation, ConversationState::Error);
        assert!(matches!(
            snapshot.last_error,
            Some(SpeechError::ResourceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn shutdown_closes_handle() {
        let (engine, _senders) = accepting_engine(0);
        let coordinator = SpeechCoordinator::spawn(Arc::new(engine), quiet_settings()).unwrap();
        coordinator.shutdown().await.unwrap();

        let err = coordinator.snapshot().await.unwrap_err();
        assert_eq!(err, crate::CoordinatorError::Closed);
    }

    #[tokio::test]
    async fn status_history_is_bounded() {
        let (engine, senders) = accepting_engine(0);
        let coordinator = SpeechCoordinator::spawn(Arc::new(engine), quiet_settings()).unwrap();

        let mut ids = Vec::new();
        for n in 0..(STATUS_HISTORY + 1) {
            let id = coordinator
                .speak(
                    format!("line {n}"),
                    SynthesisOptions::default(),
                    RequestCallbacks::new(),
                    None,
                )
                .await
                .unwrap();
            senders.lock().unwrap()[n].ended();
            ids.push(id);
        }
        coordinator.snapshot().await.unwrap();

        assert_eq!(coordinator.status(ids[0]).await.unwrap(), None);
        assert_eq!(
            coordinator.status(ids[STATUS_HISTORY]).await.unwrap(),
            Some(RequestStatus::Completed)
        );
    }
}
