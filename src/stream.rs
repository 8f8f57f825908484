// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Snapshot stream consumer.
//!
//! Keeps a subscription to one thing open for as long as the adapter runs
//! and hands snapshots to the caller one at a time. The caller pulls, so a
//! snapshot is never read while the previous one is still being handled.
//!
//! # Reconnect
//!
//! ```text
//!              listen ok                    item
//! Connecting ────────────▶ Streaming ──────────────▶ (caller)
//!     ▲   │ listen err        │ retryable err / end
//!     │   ▼                   ▼
//!     └── Backoff ◀──── Disconnected
//! ```
//!
//! Backoff grows exponentially up to the configured ceiling and resets after
//! every delivered snapshot. A non-retryable item error (a malformed body)
//! is logged and skipped without touching the subscription.
//!
//! Any state moves to `Stopped` as soon as the shutdown signal fires, including
//! in the middle of a backoff sleep or a pending `listen`.

use crate::document::Document;
use crate::metrics;
use crate::resilience::{shutdown_requested, sleep_or_shutdown, Backoff, RetryConfig};
use crate::store::{ShadowStore, SnapshotStream};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Where the consumer is in its connect / stream / retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// No subscription; about to back off.
    Disconnected,
    /// `listen` in flight.
    Connecting,
    /// Subscription open.
    Streaming,
    /// Waiting before the next subscribe attempt.
    Backoff,
    /// Shutdown observed. Terminal.
    Stopped,
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Streaming => write!(f, "Streaming"),
            Self::Backoff => write!(f, "Backoff"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Pull-based subscription with automatic resubscribe.
pub struct StreamConsumer<S: ShadowStore> {
    store: Arc<S>,
    thing: String,
    backoff: Backoff,
    shutdown_rx: watch::Receiver<bool>,
    stream: Option<SnapshotStream>,
    state: ConsumerState,
    reconnects: u64,
    discarded: u64,
    /// Set by `resync()`: the redelivered snapshot must not reset the backoff,
    /// so a store that keeps refusing patches is retried ever more slowly.
    hold_backoff: bool,
}

impl<S: ShadowStore> StreamConsumer<S> {
    pub fn new(
        store: Arc<S>,
        thing: impl Into<String>,
        retry: RetryConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            thing: thing.into(),
            backoff: Backoff::new(retry),
            shutdown_rx,
            stream: None,
            state: ConsumerState::Disconnected,
            reconnects: 0,
            discarded: 0,
            hold_backoff: false,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn thing(&self) -> &str {
        &self.thing
    }

    /// Resubscribe attempts made after a failure.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects
    }

    /// Deliveries skipped because they could not be decoded.
    pub fn discarded_count(&self) -> u64 {
        self.discarded
    }

    /// Wait for the next snapshot.
    ///
    /// Subscribes (or resubscribes) as needed. Returns `None` only once
    /// shutdown has been requested; transport failures never surface here.
    pub async fn next_snapshot(&mut self) -> Option<Document> {
        loop {
            if self.state == ConsumerState::Stopped || *self.shutdown_rx.borrow() {
                self.close();
                return None;
            }

            let mut stream = match self.stream.take() {
                Some(stream) => stream,
                None => self.subscribe().await?,
            };

            let item = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown_rx) => None,
                item = stream.next() => Some(item),
            };
            let Some(item) = item else {
                self.close();
                return None;
            };

            match item {
                Some(Ok(doc)) => {
                    self.stream = Some(stream);
                    if !std::mem::take(&mut self.hold_backoff) {
                        self.backoff.reset();
                    }
                    metrics::record_snapshot_received(&self.thing);
                    return Some(doc);
                }
                Some(Err(e)) if !e.is_retryable() => {
                    warn!(thing = %self.thing, error = %e, "Discarding snapshot");
                    metrics::record_snapshot_discarded(&self.thing, "malformed");
                    self.discarded += 1;
                    self.stream = Some(stream);
                }
                Some(Err(e)) => {
                    warn!(thing = %self.thing, error = %e, "Subscription failed");
                    metrics::record_error(&self.thing, "transport");
                    drop(stream);
                    if self.back_off().await {
                        return None;
                    }
                }
                None => {
                    warn!(thing = %self.thing, "Subscription ended");
                    drop(stream);
                    if self.back_off().await {
                        return None;
                    }
                }
            }
        }
    }

    /// Drop the subscription and back off before the next `next_snapshot()`
    /// opens a fresh one, which starts with the current document.
    ///
    /// Returns `true` if stopped meanwhile.
    pub async fn resync(&mut self) -> bool {
        info!(thing = %self.thing, "Resubscribing to redeliver the current document");
        self.stream = None;
        self.hold_backoff = true;
        self.back_off().await
    }

    /// Subscribe, backing off between failures. `None` means stopped.
    async fn subscribe(&mut self) -> Option<SnapshotStream> {
        loop {
            self.set_state(ConsumerState::Connecting);

            let result = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown_rx) => None,
                result = self.store.listen(&self.thing) => Some(result),
            };
            let Some(result) = result else {
                self.close();
                return None;
            };

            match result {
                Ok(stream) => {
                    metrics::record_subscribe(&self.thing, true);
                    info!(thing = %self.thing, reconnects = self.reconnects, "Subscribed");
                    self.set_state(ConsumerState::Streaming);
                    return Some(stream);
                }
                Err(e) => {
                    metrics::record_subscribe(&self.thing, false);
                    if e.is_retryable() {
                        warn!(thing = %self.thing, error = %e, "Subscribe failed");
                    } else {
                        error!(thing = %self.thing, error = %e, "Subscribe failed with non-retryable error");
                    }
                    if self.back_off().await {
                        return None;
                    }
                }
            }
        }
    }

    /// Sleep out one backoff step. Returns `true` if stopped meanwhile.
    async fn back_off(&mut self) -> bool {
        self.set_state(ConsumerState::Disconnected);
        let delay = self.backoff.next_delay();
        self.reconnects += 1;
        metrics::record_reconnect(&self.thing, delay);
        debug!(
            thing = %self.thing,
            attempt = self.backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "Backing off before resubscribe"
        );

        self.set_state(ConsumerState::Backoff);
        if sleep_or_shutdown(delay, &mut self.shutdown_rx).await {
            self.close();
            return true;
        }
        false
    }

    fn close(&mut self) {
        self.stream = None;
        if self.state != ConsumerState::Stopped {
            debug!(thing = %self.thing, "Consumer stopped");
        }
        self.set_state(ConsumerState::Stopped);
    }

    fn set_state(&mut self, state: ConsumerState) {
        self.state = state;
        metrics::set_consumer_state(&self.thing, &state.to_string());
    }
}
