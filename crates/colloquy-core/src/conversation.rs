//! Conversation turn-taking state machine.
//!
//! The table is pure: it maps `(state, event)` to the next state and knows
//! nothing about timers or engines. The coordinator decides *when* an event
//! happens (silence elapsed, synthesis ended, ...) and feeds it here.
//!
//! ```text
//!   Idle ──StartListening──▶ Listening ──FinalTranscriptReady──▶ Processing
//!    ▲                          │                                    │
//!    │                      ManualStop                        AiResponseReady
//!    │                          ▼                                    ▼
//!    └────────────────────── Idle ◀──────────SpeechEnded────── AiSpeaking
//!
//!   any ──ErrorRaised──▶ Error ──Reset──▶ Idle
//! ```

use serde::{Deserialize, Serialize};

/// Interaction state of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Recognition is active and the user may be speaking.
    Listening,
    /// A finalized utterance is waiting for the caller's business logic.
    Processing,
    /// Synthesis of a reply is active.
    AiSpeaking,
    /// A fault was raised; waiting for a reset.
    Error,
}

/// Input to the conversation state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A recognition request became active.
    StartListening {
        /// Whether the engine offers recognition at all.
        recognition_available: bool,
    },
    /// The silence timeout elapsed (or the engine ended) with this transcript.
    FinalTranscriptReady {
        /// Accumulated transcript; blank means nothing was said.
        transcript: String,
    },
    /// The caller stopped listening.
    ManualStop {
        /// Go straight to `Processing` with the pending transcript.
        finalize: bool,
    },
    /// A synthesis request became active.
    AiResponseReady,
    /// The active synthesis completed.
    SpeechEnded,
    /// The active operation was interrupted (preemption).
    Interrupted,
    /// A fault was reported.
    ErrorRaised,
    /// Recover to `Idle`.
    Reset,
}

impl ConversationEvent {
    /// Name of the event for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartListening { .. } => "start_listening",
            Self::FinalTranscriptReady { .. } => "final_transcript_ready",
            Self::ManualStop { .. } => "manual_stop",
            Self::AiResponseReady => "ai_response_ready",
            Self::SpeechEnded => "speech_ended",
            Self::Interrupted => "interrupted",
            Self::ErrorRaised => "error_raised",
            Self::Reset => "reset",
        }
    }
}

/// A rejected transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The event has no entry for the current state.
    #[error("No transition from {from:?} on {event}")]
    Invalid {
        from: ConversationState,
        event: &'static str,
    },

    /// The entry exists but its guard did not hold.
    #[error("Guard failed for {event} in {from:?}")]
    GuardFailed {
        from: ConversationState,
        event: &'static str,
    },
}

impl ConversationState {
    /// Apply an event, returning the next state.
    pub fn apply(self, event: &ConversationEvent) -> Result<Self, TransitionError> {
        use ConversationEvent as E;
        use ConversationState as S;

        let invalid = || TransitionError::Invalid {
            from: self,
            event: event.name(),
        };

        match (self, event) {
            (_, E::ErrorRaised) => Ok(S::Error),
            (_, E::Reset) => Ok(S::Idle),

            (S::Idle | S::Processing, E::StartListening { recognition_available }) => {
                if *recognition_available {
                    Ok(S::Listening)
                } else {
                    Err(TransitionError::GuardFailed {
                        from: self,
                        event: event.name(),
                    })
                }
            }

            (S::Listening, E::FinalTranscriptReady { transcript }) => {
                if transcript.trim().is_empty() {
                    Ok(S::Idle)
                } else {
                    Ok(S::Processing)
                }
            }

            (S::Listening, E::ManualStop { finalize }) => {
                Ok(if *finalize { S::Processing } else { S::Idle })
            }

            (S::Idle | S::Processing, E::AiResponseReady) => Ok(S::AiSpeaking),

            (S::AiSpeaking, E::SpeechEnded) => Ok(S::Idle),

            (S::Listening | S::AiSpeaking | S::Processing, E::Interrupted) => Ok(S::Idle),

            _ => Err(invalid()),
        }
    }

    /// Whether recognition is the active operation.
    #[must_use]
    pub const fn is_listening(self) -> bool {
        matches!(self, Self::Listening)
    }

    /// Whether synthesis is the active operation.
    #[must_use]
    pub const fn is_speaking(self) -> bool {
        matches!(self, Self::AiSpeaking)
    }

    /// Wire label (`"idle"`, `"listening"`, ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::AiSpeaking => "ai_speaking",
            Self::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn final_transcript(text: &str) -> ConversationEvent {
        ConversationEvent::FinalTranscriptReady {
            transcript: text.to_string(),
        }
    }

    #[test]
    fn full_turn_cycle() {
        let state = ConversationState::Idle;
        let state = state
            .apply(&ConversationEvent::StartListening {
                recognition_available: true,
            })
            .unwrap();
        assert_eq!(state, ConversationState::Listening);

        let state = state.apply(&final_transcript("hello world")).unwrap();
        assert_eq!(state, ConversationState::Processing);

        let state = state.apply(&ConversationEvent::AiResponseReady).unwrap();
        assert_eq!(state, ConversationState::AiSpeaking);

        let state = state.apply(&ConversationEvent::SpeechEnded).unwrap();
        assert_eq!(state, ConversationState::Idle);
    }

    #[test]
    fn blank_transcript_returns_to_idle() {
        let state = ConversationState::Listening.apply(&final_transcript("   ")).unwrap();
        assert_eq!(state, ConversationState::Idle);
    }

    #[test]
    fn start_listening_guard() {
        let err = ConversationState::Idle
            .apply(&ConversationEvent::StartListening {
                recognition_available: false,
            })
            .unwrap_err();
        assert!(matches!(err, TransitionError::GuardFailed { .. }));
    }

    #[test]
    fn manual_stop_pause_and_finalize() {
        let paused = ConversationState::Listening
            .apply(&ConversationEvent::ManualStop { finalize: false })
            .unwrap();
        assert_eq!(paused, ConversationState::Idle);

        let finalized = ConversationState::Listening
            .apply(&ConversationEvent::ManualStop { finalize: true })
            .unwrap();
        assert_eq!(finalized, ConversationState::Processing);
    }

    #[test]
    fn error_from_any_state_and_reset() {
        for state in [
            ConversationState::Idle,
            ConversationState::Listening,
            ConversationState::Processing,
            ConversationState::AiSpeaking,
        ] {
            let errored = state.apply(&ConversationEvent::ErrorRaised).unwrap();
            assert_eq!(errored, ConversationState::Error);
        }

        let reset = ConversationState::Error
            .apply(&ConversationEvent::Reset)
            .unwrap();
        assert_eq!(reset, ConversationState::Idle);
    }

    #[test]
    fn error_state_ignores_turn_events() {
        let err = ConversationState::Error
            .apply(&ConversationEvent::AiResponseReady)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Invalid {
                from: ConversationState::Error,
                event: "ai_response_ready",
            }
        );
    }

    #[test]
    fn speech_ended_outside_speaking_is_invalid() {
        assert!(ConversationState::Listening
            .apply(&ConversationEvent::SpeechEnded)
            .is_err());
    }

    #[test]
    fn listening_and_speaking_are_exclusive() {
        for state in [
            ConversationState::Idle,
            ConversationState::Listening,
            ConversationState::Processing,
            ConversationState::AiSpeaking,
            ConversationState::Error,
        ] {
            assert!(!(state.is_listening() && state.is_speaking()));
        }
    }
}
