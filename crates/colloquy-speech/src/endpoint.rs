//! Silence-based endpointing.
//!
//! While listening, every recognition result re-arms a countdown. When the
//! countdown elapses without further results the utterance is considered
//! complete. The timer itself never sleeps: it only tracks the deadline, and
//! the coordinator's event loop waits on it.

use std::time::Duration;

use tokio::time::Instant;

/// Countdown plus the transcript gathered since listening began.
#[derive(Debug, Clone)]
pub struct SilenceTimer {
    timeout: Duration,
    deadline: Option<Instant>,
    finals: String,
    partial: String,
}

impl SilenceTimer {
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
            finals: String::new(),
            partial: String::new(),
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Change the countdown length. Takes effect the next time the timer arms.
    pub const fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Fold a recognition result into the transcript and re-arm.
    ///
    /// Final segments are appended. A partial result replaces the previous
    /// partial, since engines revise hypotheses until they commit.
    /// Returns the new deadline.
    pub fn record(&mut self, transcript: &str, is_final: bool, now: Instant) -> Instant {
        if is_final {
            let segment = transcript.trim();
            if !segment.is_empty() {
                if !self.finals.is_empty() {
                    self.finals.push(' ');
                }
                self.finals.push_str(segment);
            }
            self.partial.clear();
        } else {
            self.partial.clear();
            self.partial.push_str(transcript.trim());
        }

        let deadline = now + self.timeout;
        self.deadline = Some(deadline);
        deadline
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Accumulated transcript: finals followed by the pending partial.
    pub fn transcript(&self) -> String {
        match (self.finals.is_empty(), self.partial.is_empty()) {
            (_, true) => self.finals.clone(),
            (true, false) => self.partial.clone(),
            (false, false) => format!("{} {}", self.finals, self.partial),
        }
    }

    /// The transcript, or `None` when nothing has been heard.
    pub fn pending_transcript(&self) -> Option<String> {
        let transcript = self.transcript();
        (!transcript.is_empty()).then_some(transcript)
    }

    /// Disarm and hand out the accumulated transcript, leaving the timer empty.
    pub fn take_transcript(&mut self) -> String {
        let transcript = self.transcript();
        self.reset();
        transcript
    }

    /// Disarm and forget everything heard.
    pub fn reset(&mut self) {
        self.deadline = None;
        self.finals.clear();
        self.partial.clear();
    }
}
