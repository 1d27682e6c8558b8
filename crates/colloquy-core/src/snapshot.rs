//! Coordinator snapshot DTO.
//!
//! Observers always receive the full current picture rather than a diff, so
//! a late subscriber needs nothing but the most recent snapshot.

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationState;
use crate::error::SpeechError;
use crate::request::{OperationKind, Priority, RequestId};

/// Number of queued requests in each priority tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl TierCounts {
    /// Count for a single tier.
    #[must_use]
    pub const fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }

    /// Total across all tiers.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.high + self.normal + self.low
    }
}

/// Externally observable state of the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorSnapshot {
    /// What the speech capability is doing right now.
    pub operation: OperationKind,
    /// The request holding the capability, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_request: Option<RequestId>,
    /// Number of queued (not yet active) requests.
    pub queue_length: usize,
    /// Queued requests per priority tier.
    pub queued_by_priority: TierCounts,
    /// Conversation interaction state.
    pub conversation: ConversationState,
    /// Accumulated transcript while listening, or the finalized utterance
    /// while processing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// The most recent error, kept until an explicit reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<SpeechError>,
    /// Automatic recoveries performed since the last success or reset.
    pub consecutive_failures: u32,
}

impl CoordinatorSnapshot {
    /// Whether nothing is active, nothing is queued and the conversation is idle.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.operation == OperationKind::Idle
            && self.queue_length == 0
            && self.conversation == ConversationState::Idle
    }
}
