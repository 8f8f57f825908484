// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Patch publisher.
//!
//! Writes a translated partial document back to the same thing it was read
//! from. A failed write is reported to the caller and never retried here:
//! the source leaves are still upstream, so the next snapshot carries the
//! same values and publishes them again.

use crate::document::Document;
use crate::error::{AdapterError, Result};
use crate::flatten;
use crate::metrics;
use crate::store::ShadowStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct Publisher<S: ShadowStore> {
    store: Arc<S>,
    thing: String,
    timeout: Duration,
}

impl<S: ShadowStore> Publisher<S> {
    pub fn new(store: Arc<S>, thing: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            thing: thing.into(),
            timeout,
        }
    }

    pub fn thing(&self) -> &str {
        &self.thing
    }

    /// Send one patch. Every failure comes back as [`AdapterError::Publish`].
    pub async fn publish(&self, patch: Document) -> Result<()> {
        let paths = leaf_paths(&patch);

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.store.patch(&self.thing, patch)).await;

        let result = match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(AdapterError::Publish { thing, message })) => {
                Err(AdapterError::Publish { thing, message })
            }
            Ok(Err(e)) => Err(AdapterError::Publish {
                thing: self.thing.clone(),
                message: e.to_string(),
            }),
            Err(_) => Err(AdapterError::Publish {
                thing: self.thing.clone(),
                message: format!("timed out after {:?}", self.timeout),
            }),
        };

        let elapsed = start.elapsed();
        metrics::record_publish(&self.thing, result.is_ok(), elapsed);
        match &result {
            Ok(()) => debug!(
                thing = %self.thing,
                elapsed_ms = elapsed.as_millis() as u64,
                paths = ?paths,
                "Published patch"
            ),
            Err(e) => warn!(thing = %self.thing, error = %e, paths = ?paths, "Publish failed"),
        }
        result
    }
}

/// Canonical paths of the leaves a patch writes, for logging.
fn leaf_paths(patch: &Document) -> Vec<String> {
    match flatten::leaves(patch) {
        Ok(leaves) => leaves.map(|(path, _)| path.to_canonical()).collect(),
        Err(_) => Vec::new(),
    }
}
