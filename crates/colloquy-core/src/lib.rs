//! Core domain types and ports for the colloquy speech coordinator.
//!
//! Everything in this crate is pure data: request identity and lifecycle,
//! the speech error taxonomy, the conversation transition table, the
//! snapshot delivered to observers, and coordinator settings. Runtime
//! concerns (channels, timers, engines) live in `colloquy-speech`.

#![deny(unused_crate_dependencies)]

pub mod conversation;
pub mod error;
pub mod observer;
pub mod request;
pub mod settings;
pub mod snapshot;

// Re-export commonly used types for convenience
pub use conversation::{ConversationEvent, ConversationState, TransitionError};
pub use error::{RecognitionErrorKind, SpeechError, SpeechResult};
pub use observer::{NoopObserver, StateObserver};
pub use request::{
    OperationKind, ParsePriorityError, Priority, RequestId, RequestStatus, SpeechKind,
    SynthesisOptions,
};
pub use settings::{
    CoordinatorSettings, DEFAULT_AUTO_RESTART_DELAY_MS, DEFAULT_MAX_AUTO_RECOVERIES,
    DEFAULT_MAX_QUEUE_SIZE, DEFAULT_SILENCE_TIMEOUT_MS, SettingsError, SettingsUpdate,
    StopBehavior, validate_settings,
};
pub use snapshot::{CoordinatorSnapshot, TierCounts};
