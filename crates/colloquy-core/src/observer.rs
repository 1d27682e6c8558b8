//! State observer port.
//!
//! UI collaborators implement [`StateObserver`] to render the coordinator's
//! state. Implementations handle transport details (channels, IPC, SSE).

use crate::snapshot::CoordinatorSnapshot;

/// Receives a full snapshot on every externally observable change.
///
/// Called on the coordinator's task. Implementations must not block; hand
/// the snapshot to a channel if real work is needed.
pub trait StateObserver: Send + Sync {
    /// The coordinator's state changed.
    fn on_state_change(&self, snapshot: &CoordinatorSnapshot);
}

impl<F> StateObserver for F
where
    F: Fn(&CoordinatorSnapshot) + Send + Sync,
{
    fn on_state_change(&self, snapshot: &CoordinatorSnapshot) {
        self(snapshot);
    }
}

/// A no-op observer for tests and headless contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl NoopObserver {
    /// Create a new no-op observer.
    pub const fn new() -> Self {
        Self
    }
}

impl StateObserver for NoopObserver {
    fn on_state_change(&self, _snapshot: &CoordinatorSnapshot) {
        // Intentionally do nothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn closures_are_observers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let observer: Arc<dyn StateObserver> = Arc::new(move |_: &CoordinatorSnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        observer.on_state_change(&CoordinatorSnapshot::default());
        observer.on_state_change(&CoordinatorSnapshot::default());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn noop_observer() {
        let observer: Arc<dyn StateObserver> = Arc::new(NoopObserver::new());
        observer.on_state_change(&CoordinatorSnapshot::default());
    }
}
