// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-process shadow store.
//!
//! Holds one document per thing and fans every change out to all live
//! subscriptions. Patches merge recursively: objects merge key by key, any
//! other value replaces what was there. A patch that changes the document is
//! echoed to every subscriber, including the one that wrote it; a patch that
//! changes nothing notifies no one.

use crate::document::Document;
use crate::error::{AdapterError, Result};
use crate::store::{BoxFuture, ShadowStore, SnapshotStream};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

struct Shadow {
    doc: Document,
    changes: broadcast::Sender<Document>,
}

impl Shadow {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            doc: Document::empty(),
            changes,
        }
    }
}

/// Shadow store kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    shadows: Mutex<HashMap<String, Shadow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_shadow<T>(&self, thing: &str, f: impl FnOnce(&mut Shadow) -> T) -> T {
        let mut shadows = self.shadows.lock().unwrap_or_else(|e| e.into_inner());
        let shadow = shadows.entry(thing.to_string()).or_insert_with(Shadow::new);
        f(shadow)
    }

    /// Current document for `thing` (empty if never written).
    pub fn document(&self, thing: &str) -> Document {
        self.with_shadow(thing, |s| s.doc.clone())
    }

    /// Number of live subscriptions to `thing`.
    pub fn subscriber_count(&self, thing: &str) -> usize {
        self.with_shadow(thing, |s| s.changes.receiver_count())
    }

    /// Merge a patch without an async context (seeding, tests).
    pub fn apply(&self, thing: &str, patch: Document) -> Result<()> {
        let Document::Object(patch) = patch else {
            return Err(AdapterError::Publish {
                thing: thing.to_string(),
                message: format!("patch root must be an object, got {}", patch.kind()),
            });
        };

        self.with_shadow(thing, |s| {
            if merge(&mut s.doc, patch) {
                // No receivers is fine.
                let _ = s.changes.send(s.doc.clone());
            }
        });
        Ok(())
    }

    /// End every open subscription, as if the broker restarted.
    pub fn disconnect_all(&self) {
        let mut shadows = self.shadows.lock().unwrap_or_else(|e| e.into_inner());
        for (thing, shadow) in shadows.iter_mut() {
            let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
            let old = std::mem::replace(&mut shadow.changes, changes);
            debug!(thing = %thing, subscribers = old.receiver_count(), "Dropping subscriptions");
        }
    }
}

/// Returns whether `target` changed.
fn merge(target: &mut Document, patch: BTreeMap<String, Document>) -> bool {
    let mut changed = false;
    if !target.is_object() {
        *target = Document::empty();
        changed = true;
    }
    let Document::Object(map) = target else {
        return changed;
    };
    for (key, value) in patch {
        match value {
            Document::Object(child) => {
                let node = map.entry(key).or_insert_with(|| {
                    changed = true;
                    Document::empty()
                });
                changed |= merge(node, child);
            }
            leaf => {
                if map.get(&key) != Some(&leaf) {
                    map.insert(key, leaf);
                    changed = true;
                }
            }
        }
    }
    changed
}

impl ShadowStore for MemoryStore {
    fn listen(&self, thing: &str) -> BoxFuture<'_, SnapshotStream> {
        let (current, rx) = self.with_shadow(thing, |s| (s.doc.clone(), s.changes.subscribe()));
        let thing = thing.to_string();
        Box::pin(async move {
            let initial = match current {
                Document::Object(ref map) if map.is_empty() => None,
                doc => Some(Ok(doc)),
            };

            let changes = stream::unfold((rx, thing), |(mut rx, thing)| async move {
                loop {
                    match rx.recv().await {
                        Ok(doc) => return Some((Ok(doc), (rx, thing))),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Every item is a full snapshot; the next one supersedes the skipped.
                            warn!(thing = %thing, skipped, "Subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            });

            Ok(stream::iter(initial).chain(changes).boxed())
        })
    }

    fn patch(&self, thing: &str, patch: Document) -> BoxFuture<'_, ()> {
        let result = self.apply(thing, patch);
        Box::pin(async move { result })
    }
}
