//! # Fork Event Reporters
//!
//! Implementations of the `ForkEventReporter` port.
//!
//! - `TracingReporter` - production, one `warn!` per event
//! - `InMemoryReporter` - records events for assertions

use parking_lot::Mutex;
use tracing::warn;

use crate::domain::NextForkDivergence;
use crate::ports::ForkEventReporter;

/// Log line emitted for every kept peer with a divergent next fork.
pub const NEXT_FORK_DIVERGENCE_MESSAGE: &str =
    "Peer matches fork digest but has different next fork epoch or version";

/// Reports events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TracingReporter {
    /// Create a new tracing reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ForkEventReporter for TracingReporter {
    fn next_fork_divergence(&self, event: &NextForkDivergence) {
        warn!(
            node_id = %event.node_id,
            local_next_fork_epoch = event.local_next_fork_epoch,
            remote_next_fork_epoch = event.remote_next_fork_epoch,
            local_next_fork_version = %event.local_next_fork_version,
            remote_next_fork_version = %event.remote_next_fork_version,
            "{}",
            NEXT_FORK_DIVERGENCE_MESSAGE
        );
    }
}

/// In-memory reporter for testing that stores events.
#[derive(Debug, Default)]
pub struct InMemoryReporter {
    events: Mutex<Vec<NextForkDivergence>>,
}

impl InMemoryReporter {
    /// Create a new in-memory reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all reported events.
    #[must_use]
    pub fn events(&self) -> Vec<NextForkDivergence> {
        self.events.lock().clone()
    }

    /// Number of reported events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clear all stored events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ForkEventReporter for InMemoryReporter {
    fn next_fork_divergence(&self, event: &NextForkDivergence) {
        self.events.lock().push(*event);
    }
}
