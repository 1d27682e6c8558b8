//! Exclusive ownership of the speech capability.
//!
//! At most one request holds the capability. A strictly higher-priority
//! request takes it over; the caller is told whom it displaced and must stop
//! that operation itself.

use colloquy_core::{OperationKind, Priority, RequestId, SpeechKind};

/// The request currently holding the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holder {
    pub id: RequestId,
    pub kind: SpeechKind,
    pub priority: Priority,
}

/// Outcome of [`ResourceMutex::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// The capability was free and is now held by the candidate.
    Granted,
    /// The candidate outranked the holder and now owns the capability.
    /// The displaced holder must be stopped.
    Preempted(Holder),
    /// The holder keeps the capability; the candidate has to wait.
    Busy(Holder),
}

/// Single-slot lock over the speech capability.
#[derive(Debug, Default)]
pub struct ResourceMutex {
    held: Option<Holder>,
}

impl ResourceMutex {
    pub const fn new() -> Self {
        Self { held: None }
    }

    /// Try to give the capability to `candidate`.
    ///
    /// Equal priority never preempts, so same-tier requests keep FIFO order.
    pub fn try_acquire(&mut self, candidate: Holder) -> Acquisition {
        match self.held {
            None => {
                self.held = Some(candidate);
                Acquisition::Granted
            }
            Some(current) if candidate.priority > current.priority => {
                self.held = Some(candidate);
                Acquisition::Preempted(current)
            }
            Some(current) => Acquisition::Busy(current),
        }
    }

    /// Release the capability if `id` holds it.
    ///
    /// Returns `false` for stale releases, which leave the mutex untouched.
    pub fn release(&mut self, id: RequestId) -> bool {
        match self.held {
            Some(holder) if holder.id == id => {
                self.held = None;
                true
            }
            _ => false,
        }
    }

    /// Release unconditionally, returning the previous holder.
    pub const fn force_release(&mut self) -> Option<Holder> {
        self.held.take()
    }

    pub const fn holder(&self) -> Option<Holder> {
        self.held
    }

    pub fn is_held_by(&self, id: RequestId) -> bool {
        self.held.is_some_and(|h| h.id == id)
    }

    /// What the capability is doing right now.
    pub fn current_operation(&self) -> OperationKind {
        self.held
            .map_or(OperationKind::Idle, |holder| holder.kind.into())
    }
}
