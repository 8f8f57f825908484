// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-snapshot pipeline and the worker that drives it.
//!
//! ```text
//! snapshot ─▶ flatten ─▶ translate ─▶ (nothing mapped? stop here)
//!                                       │
//!                                       ▼
//!                                  build tree ─▶ publish
//! ```
//!
//! One worker task owns the consumer and runs this pipeline to completion for
//! each snapshot before asking for the next one. A snapshot that cannot be
//! translated (malformed, or a panic inside the pure stages) counts as
//! discarded and the loop carries on. A failed publish is counted, then the
//! worker resubscribes after one backoff step. A fresh subscription starts
//! with the current document, so the unchanged source values are published
//! again even when the store only notifies on change.
//!
//! # Feedback
//!
//! Every published patch comes back in a later snapshot. Its leaves sit at
//! destination paths, which the table guarantees are never sources, so they
//! translate to nothing. The source leaves still in that snapshot produce the
//! same patch again; merging it changes nothing, the store sends no further
//! snapshot, and the echo settles after one round.

use super::types::PipelineStats;
use crate::document::Document;
use crate::error::Result;
use crate::flatten;
use crate::metrics;
use crate::publisher::Publisher;
use crate::store::ShadowStore;
use crate::stream::StreamConsumer;
use crate::translate::TranslationTable;
use crate::tree;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

/// Result of translating one snapshot.
#[derive(Debug)]
struct Translated {
    /// `None` when no leaf matched.
    patch: Option<Document>,
    leaves: usize,
    translated: usize,
}

fn translate_counted(table: &TranslationTable, snapshot: &Document) -> Result<Translated> {
    let mut leaves = 0;
    let mut mapped = Vec::new();
    for (path, value) in flatten::leaves(snapshot)? {
        leaves += 1;
        if let Some(destination) = table.translate_path(&path) {
            debug!(path = %path, destination = %destination, value = %value, "Translating leaf");
            mapped.push((destination.clone(), value.clone()));
        }
    }

    let translated = mapped.len();
    let patch = (!mapped.is_empty()).then(|| tree::build(mapped));
    Ok(Translated {
        patch,
        leaves,
        translated,
    })
}

/// Translate a snapshot into the patch that should be published.
///
/// Returns `Ok(None)` when no leaf of the snapshot is in the table, in which
/// case nothing is published. Fails only if the snapshot root is not an object.
pub fn translate_snapshot(table: &TranslationTable, snapshot: &Document) -> Result<Option<Document>> {
    Ok(translate_counted(table, snapshot)?.patch)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// What became of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Malformed, or nothing mapped.
    Skipped,
    Published,
    /// The store did not take the patch. The current document has to be
    /// delivered again for the values to get through.
    PublishFailed,
}

async fn handle_snapshot<S: ShadowStore>(
    table: &TranslationTable,
    publisher: &Publisher<S>,
    stats: &PipelineStats,
    snapshot: Document,
) -> Outcome {
    let thing = publisher.thing();
    stats.snapshots_received.fetch_add(1, Ordering::Relaxed);

    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| translate_counted(table, &snapshot)));
    let translated = match outcome {
        Ok(Ok(translated)) => translated,
        Ok(Err(e)) => {
            warn!(error = %e, kind = snapshot.kind(), "Snapshot produced no usable update");
            stats.snapshots_discarded.fetch_add(1, Ordering::Relaxed);
            metrics::record_snapshot_discarded(thing, "malformed");
            return Outcome::Skipped;
        }
        Err(payload) => {
            error!(panic = panic_message(payload.as_ref()), "Translation panicked, snapshot skipped");
            stats.snapshots_discarded.fetch_add(1, Ordering::Relaxed);
            metrics::record_snapshot_discarded(thing, "panic");
            return Outcome::Skipped;
        }
    };
    metrics::record_snapshot_translated(thing, translated.leaves, translated.translated, start.elapsed());

    let Some(patch) = translated.patch else {
        trace!(leaves = translated.leaves, "No mapped leaves, skipping publish");
        return Outcome::Skipped;
    };

    debug!(
        leaves = translated.leaves,
        translated = translated.translated,
        "Publishing translated leaves"
    );
    stats
        .leaves_translated
        .fetch_add(translated.translated as u64, Ordering::Relaxed);
    stats.publishes_attempted.fetch_add(1, Ordering::Relaxed);

    // Publisher logs the failure.
    match publisher.publish(patch).await {
        Ok(()) => {
            stats.publishes_succeeded.fetch_add(1, Ordering::Relaxed);
            Outcome::Published
        }
        Err(_) => {
            stats.publishes_failed.fetch_add(1, Ordering::Relaxed);
            Outcome::PublishFailed
        }
    }
}

/// Consumer-side counters already folded into the shared stats.
#[derive(Default)]
struct ConsumerCounts {
    reconnects: u64,
    discarded: u64,
}

impl ConsumerCounts {
    fn sync<S: ShadowStore>(&mut self, consumer: &StreamConsumer<S>, stats: &PipelineStats) {
        let reconnects = consumer.reconnect_count();
        let discarded = consumer.discarded_count();
        stats
            .reconnects
            .fetch_add(reconnects - self.reconnects, Ordering::Relaxed);
        stats
            .snapshots_discarded
            .fetch_add(discarded - self.discarded, Ordering::Relaxed);
        self.reconnects = reconnects;
        self.discarded = discarded;
    }
}

/// Run the adapter worker until the consumer observes the stop signal.
pub(crate) async fn run_worker<S: ShadowStore>(
    mut consumer: StreamConsumer<S>,
    publisher: Publisher<S>,
    table: Arc<TranslationTable>,
    stats: Arc<PipelineStats>,
) {
    let span = info_span!("adapter", thing = %consumer.thing());

    async move {
        info!(entries = table.len(), "Worker started");

        let mut counted = ConsumerCounts::default();
        while let Some(snapshot) = consumer.next_snapshot().await {
            counted.sync(&consumer, &stats);
            if handle_snapshot(&table, &publisher, &stats, snapshot).await == Outcome::PublishFailed {
                // A store that only notifies on change would never send this
                // document again.
                consumer.resync().await;
            }
        }
        counted.sync(&consumer, &stats);

        info!(state = %consumer.state(), "Worker stopped");
    }
    .instrument(span)
    .await
}
