// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Path adapter coordinator.
//!
//! The orchestrator that ties together:
//! - The subscription via [`crate::stream::StreamConsumer`]
//! - The per-snapshot pipeline in [`translate_snapshot`]
//! - Patch writes via [`crate::publisher::Publisher`]
//!
//! # Architecture
//!
//! The coordinator owns the lifecycle only. `start()` spawns one worker task
//! that owns the consumer and the pipeline; `stop()` flips a watch flag the
//! worker observes at each suspension point (waiting for a snapshot, backing
//! off, subscribing) and waits a bounded time for it to finish the snapshot
//! in hand. The subscription is dropped with the worker, so the store is
//! never left holding an orphaned listener.
//!
//! Dropping a running adapter closes the stop channel, which the worker also
//! treats as a stop request.

mod pipeline;
mod types;

pub use pipeline::translate_snapshot;
pub use types::{AdapterState, AdapterStats};

use crate::config::AdapterConfig;
use crate::error::{AdapterError, Result};
use crate::metrics;
use crate::publisher::Publisher;
use crate::store::ShadowStore;
use crate::stream::StreamConsumer;
use crate::translate::TranslationTable;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use types::PipelineStats;

/// Handles owned while a worker is alive.
#[derive(Default)]
struct Control {
    shutdown_tx: Option<watch::Sender<bool>>,
    worker: Option<JoinHandle<()>>,
}

/// Bidirectional path relay for one thing.
///
/// Reads full snapshots of the thing, rewrites the leaves listed in the
/// translation table to their destination paths, and merges the result back
/// into the same thing.
pub struct PathAdapter<S: ShadowStore> {
    config: AdapterConfig,

    /// Read-only after load; shared with the worker without locking.
    table: Arc<TranslationTable>,

    store: Arc<S>,

    /// Adapter state (broadcast to watchers)
    state_tx: watch::Sender<AdapterState>,
    state_rx: watch::Receiver<AdapterState>,

    stats: Arc<PipelineStats>,

    /// Serializes start/stop.
    control: Mutex<Control>,
}

impl<S: ShadowStore> PathAdapter<S> {
    /// Create an adapter in the `Created` state.
    ///
    /// Fails if the configuration is invalid; nothing is started in that case.
    pub fn new(config: AdapterConfig, table: TranslationTable, store: Arc<S>) -> Result<Self> {
        config.validate()?;

        let (state_tx, state_rx) = watch::channel(AdapterState::Created);
        metrics::set_adapter_state("Created");

        Ok(Self {
            config,
            table: Arc::new(table),
            store,
            state_tx,
            state_rx,
            stats: Arc::new(PipelineStats::default()),
            control: Mutex::new(Control::default()),
        })
    }

    /// Get current adapter state.
    pub fn state(&self) -> AdapterState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    pub fn state_receiver(&self) -> watch::Receiver<AdapterState> {
        self.state_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), AdapterState::Running)
    }

    /// Pipeline counters, accumulated across restarts.
    pub fn stats(&self) -> AdapterStats {
        self.stats.snapshot()
    }

    pub fn table(&self) -> &TranslationTable {
        &self.table
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn thing(&self) -> &str {
        &self.config.store.thing
    }

    /// Start relaying.
    ///
    /// A no-op while already running, so at most one worker exists. Fails
    /// with [`AdapterError::InvalidState`] while a stop is in progress.
    pub async fn start(&self) -> Result<()> {
        if self.state() == AdapterState::Stopping {
            return Err(AdapterError::InvalidState {
                expected: "Created, Running or Stopped".to_string(),
                actual: AdapterState::Stopping.to_string(),
            });
        }

        let mut control = self.control.lock().await;
        match self.state() {
            AdapterState::Running => {
                debug!(thing = %self.thing(), "Adapter already running");
                return Ok(());
            }
            AdapterState::Stopping => {
                return Err(AdapterError::InvalidState {
                    expected: "Created, Running or Stopped".to_string(),
                    actual: AdapterState::Stopping.to_string(),
                });
            }
            AdapterState::Created | AdapterState::Stopped => {}
        }

        info!(
            thing = %self.thing(),
            store = %self.config.store.url,
            entries = self.table.len(),
            "Starting path adapter"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let consumer = StreamConsumer::new(
            Arc::clone(&self.store),
            self.thing(),
            self.config.stream.retry_config(),
            shutdown_rx,
        );
        let publisher = Publisher::new(
            Arc::clone(&self.store),
            self.thing(),
            self.config.store.request_timeout_duration(),
        );

        let handle = tokio::spawn(pipeline::run_worker(
            consumer,
            publisher,
            Arc::clone(&self.table),
            Arc::clone(&self.stats),
        ));

        control.shutdown_tx = Some(shutdown_tx);
        control.worker = Some(handle);
        self.set_state(AdapterState::Running);
        Ok(())
    }

    /// Stop relaying and wait for the worker.
    ///
    /// A no-op before the first `start()` and after a completed stop. The
    /// wait is bounded by `drain_timeout`; a worker still busy after that
    /// (a publish stuck in the transport) is aborted.
    pub async fn stop(&self) {
        let mut control = self.control.lock().await;
        match self.state() {
            AdapterState::Created | AdapterState::Stopped => {
                debug!(thing = %self.thing(), state = %self.state(), "Adapter not running, nothing to stop");
                return;
            }
            AdapterState::Running | AdapterState::Stopping => {}
        }

        info!(thing = %self.thing(), "Stopping path adapter");
        self.set_state(AdapterState::Stopping);

        if let Some(shutdown_tx) = control.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        if let Some(mut handle) = control.worker.take() {
            let drain_timeout = self.config.drain_timeout_duration();
            match tokio::time::timeout(drain_timeout, &mut handle).await {
                Ok(Ok(())) => {
                    debug!("Worker completed gracefully");
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Worker panicked during shutdown");
                    metrics::record_error(self.thing(), "worker_panic");
                }
                Err(_) => {
                    warn!(?drain_timeout, "Worker did not drain in time, aborting");
                    handle.abort();
                }
            }
        }

        self.set_state(AdapterState::Stopped);
        let stats = self.stats();
        info!(
            thing = %self.thing(),
            snapshots = stats.snapshots_received,
            publishes = stats.publishes_succeeded,
            "Path adapter stopped"
        );
    }

    fn set_state(&self, state: AdapterState) {
        let _ = self.state_tx.send(state);
        metrics::set_adapter_state(&state.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn adapter() -> PathAdapter<MemoryStore> {
        PathAdapter::new(
            AdapterConfig::for_testing("vss"),
            TranslationTable::builtin().unwrap(),
            Arc::new(MemoryStore::new()),
        )
        .unwrap()
    }

    async fn wait_for<F: Fn() -> bool>(check: F) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !check() {
            assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn test_adapter_initial_state() {
        let adapter = adapter();
        assert_eq!(adapter.state(), AdapterState::Created);
        assert!(!adapter.is_running());
        assert_eq!(adapter.thing(), "vss");
        assert_eq!(adapter.table().len(), 4);
        assert_eq!(adapter.stats(), AdapterStats::default());
    }

    #[test]
    fn test_adapter_state_receiver() {
        let adapter = adapter();
        let state_rx = adapter.state_receiver();
        assert_eq!(*state_rx.borrow(), AdapterState::Created);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = AdapterConfig::for_testing("vss");
        config.store.thing = String::new();
        let result = PathAdapter::new(
            config,
            TranslationTable::builtin().unwrap(),
            Arc::new(MemoryStore::new()),
        );
        assert!(matches!(result, Err(AdapterError::Config(_))));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let adapter = adapter();
        adapter.stop().await;
        assert_eq!(adapter.state(), AdapterState::Created);
    }

    #[tokio::test]
    async fn test_start_stop() {
        let adapter = adapter();
        adapter.start().await.unwrap();
        assert!(adapter.is_running());

        let store = Arc::clone(adapter.store());
        wait_for(|| store.subscriber_count("vss") == 1).await;

        adapter.stop().await;
        assert_eq!(adapter.state(), AdapterState::Stopped);
        assert_eq!(store.subscriber_count("vss"), 0);

        // Second stop is a no-op.
        adapter.stop().await;
        assert_eq!(adapter.state(), AdapterState::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_one_worker() {
        let adapter = adapter();
        adapter.start().await.unwrap();
        adapter.start().await.unwrap();

        let store = Arc::clone(adapter.store());
        wait_for(|| store.subscriber_count("vss") == 1).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.subscriber_count("vss"), 1);

        adapter.stop().await;
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let adapter = adapter();
        adapter.start().await.unwrap();
        adapter.stop().await;
        adapter.start().await.unwrap();
        assert!(adapter.is_running());

        let store = Arc::clone(adapter.store());
        store
            .apply("vss", Document::from(json!({"Vehicle": {"Speed": 7}})))
            .unwrap();
        wait_for(|| adapter.stats().publishes_succeeded >= 1).await;

        adapter.stop().await;
    }

    #[tokio::test]
    async fn test_start_while_stopping_is_invalid() {
        let adapter = adapter();
        // Simulate a stop in progress
        let _ = adapter.state_tx.send(AdapterState::Stopping);

        let result = adapter.start().await;
        match result {
            Err(AdapterError::InvalidState { actual, .. }) => assert_eq!(actual, "Stopping"),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }
}
