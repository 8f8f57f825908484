// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Adapter state and counters.
//!
//! # State Transitions
//!
//! ```text
//!            start()                stop()
//! Created ───────────→ Running ───────────→ Stopping
//!    │                   ↑                     │
//!    │ stop(): no-op     │ start()             │ (worker drained
//!    ↓                   │                     ↓  or aborted)
//! Created             Stopped ←────────────────┘
//! ```
//!
//! - **Created**: After `PathAdapter::new()`. No subscription.
//! - **Running**: The worker owns the subscription and the per-snapshot pipeline.
//! - **Stopping**: Stop signalled; waiting for the worker to finish its snapshot.
//! - **Stopped**: Worker gone, subscription released. `start()` may run again.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle state of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Created but never started.
    Created,

    /// Relaying snapshots.
    Running,

    /// Stop requested, worker draining.
    Stopping,

    /// Worker finished. Safe to drop or restart.
    Stopped,
}

impl std::fmt::Display for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterState::Created => write!(f, "Created"),
            AdapterState::Running => write!(f, "Running"),
            AdapterState::Stopping => write!(f, "Stopping"),
            AdapterState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Point-in-time copy of the pipeline counters.
///
/// Counters accumulate across restarts of the same adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterStats {
    /// Snapshots handed to the pipeline.
    pub snapshots_received: u64,
    /// Snapshots that produced no usable update because they failed to translate.
    pub snapshots_discarded: u64,
    /// Leaves that matched a table entry.
    pub leaves_translated: u64,
    pub publishes_attempted: u64,
    pub publishes_succeeded: u64,
    pub publishes_failed: u64,
    /// Resubscribes after transport failures.
    pub reconnects: u64,
}

/// Live counters shared between the adapter and its worker.
#[derive(Debug, Default)]
pub(crate) struct PipelineStats {
    pub snapshots_received: AtomicU64,
    pub snapshots_discarded: AtomicU64,
    pub leaves_translated: AtomicU64,
    pub publishes_attempted: AtomicU64,
    pub publishes_succeeded: AtomicU64,
    pub publishes_failed: AtomicU64,
    pub reconnects: AtomicU64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> AdapterStats {
        AdapterStats {
            snapshots_received: self.snapshots_received.load(Ordering::Relaxed),
            snapshots_discarded: self.snapshots_discarded.load(Ordering::Relaxed),
            leaves_translated: self.leaves_translated.load(Ordering::Relaxed),
            publishes_attempted: self.publishes_attempted.load(Ordering::Relaxed),
            publishes_succeeded: self.publishes_succeeded.load(Ordering::Relaxed),
            publishes_failed: self.publishes_failed.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_state_display() {
        assert_eq!(AdapterState::Created.to_string(), "Created");
        assert_eq!(AdapterState::Running.to_string(), "Running");
        assert_eq!(AdapterState::Stopping.to_string(), "Stopping");
        assert_eq!(AdapterState::Stopped.to_string(), "Stopped");
    }

    #[test]
    fn test_adapter_state_equality() {
        assert_eq!(AdapterState::Created, AdapterState::Created);
        assert_ne!(AdapterState::Created, AdapterState::Running);
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = PipelineStats::default();
        assert_eq!(stats.snapshot(), AdapterStats::default());

        stats.snapshots_received.fetch_add(3, Ordering::Relaxed);
        stats.publishes_failed.fetch_add(1, Ordering::Relaxed);

        let snap = stats.snapshot();
        assert_eq!(snap.snapshots_received, 3);
        assert_eq!(snap.publishes_failed, 1);
        assert_eq!(snap.publishes_succeeded, 0);
    }
}
