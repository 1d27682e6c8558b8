//! Speech I/O coordination.
//!
//! A single [`SpeechCoordinator`] serializes access to one exclusive speech
//! capability (one synthesis or one recognition at a time), orders waiting
//! requests by priority, preempts lower-priority work, endpoints utterances
//! by silence and drives the conversation turn-taking cycle.
//!
//! # Architecture
//!
//! - [`queue`], [`resource`] and [`endpoint`] are pure synchronous building
//!   blocks with no I/O.
//! - [`engine`] is the port to the actual speech provider, with a
//!   timer-driven [`SimulatedEngine`] for demos and tests.
//! - [`coordinator`] owns all of the above inside one tokio task and exposes
//!   a cloneable handle.

#![deny(unused_crate_dependencies)]

pub mod coordinator;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod queue;
pub mod request;
pub mod resource;

pub use coordinator::{SpeechCoordinator, SubscriptionId};
pub use engine::simulated::{RecognitionStep, SimulatedEngine, SimulatedEngineConfig};
pub use engine::{
    EngineCapabilities, EngineEvent, EngineEventKind, EngineEventSender, SpeechEngine,
    SynthesisJob,
};
pub use error::CoordinatorError;
pub use request::{RequestCallbacks, SpeechPayload, SpeechRequest};

// Dev-dependencies only used from the integration tests.
#[cfg(test)]
use tokio_test as _;
