//! Scripted ShadowStore for testing.
//!
//! Each `listen()` call consumes the next [`ListenScript`]: either an
//! immediate failure or a stream of scripted items. Records every `patch()`
//! for assertions and counts live subscriptions so tests can check that a
//! stopped adapter released its stream.

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use vss_path_adapter::store::{BoxFuture, ShadowStore, SnapshotStream};
use vss_path_adapter::{AdapterError, Document, Result};

/// One item delivered on a scripted subscription.
#[derive(Debug, Clone)]
pub enum Item {
    /// A full snapshot.
    Snapshot(Value),
    /// A transport failure (retryable).
    Error(String),
    /// An undecodable delivery (not retryable).
    Malformed(String),
}

impl Item {
    fn into_result(self) -> Result<Document> {
        match self {
            Item::Snapshot(v) => Ok(Document::from(v)),
            Item::Error(msg) => Err(AdapterError::transport_msg("listen", msg)),
            Item::Malformed(msg) => Err(AdapterError::MalformedSnapshot(msg)),
        }
    }
}

/// What one `listen()` call does.
#[derive(Debug, Clone)]
pub enum ListenScript {
    /// Fail the subscribe call itself.
    Fail(String),
    /// Deliver `items`, then stay open (`end = false`) or end the stream.
    Stream { items: Vec<Item>, end: bool },
}

impl ListenScript {
    /// Deliver snapshots and stay open.
    pub fn snapshots(values: impl IntoIterator<Item = Value>) -> Self {
        ListenScript::Stream {
            items: values.into_iter().map(Item::Snapshot).collect(),
            end: false,
        }
    }

    /// Deliver items and stay open.
    pub fn items(items: Vec<Item>) -> Self {
        ListenScript::Stream { items, end: false }
    }

    /// Deliver items, then end the subscription.
    pub fn ending(items: Vec<Item>) -> Self {
        ListenScript::Stream { items, end: true }
    }
}

/// Decrements the live-subscription count when the stream is dropped.
struct Tracked {
    inner: SnapshotStream,
    active: Arc<AtomicUsize>,
}

impl Stream for Tracked {
    type Item = Result<Document>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock store driven by a queue of listen scripts.
///
/// # Example
/// ```rust,ignore
/// let store = ScriptedStore::new();
/// store.push(ListenScript::Fail("refused".into()));
/// store.push(ListenScript::snapshots([json!({"Vehicle": {"Speed": 1}})]));
///
/// // Use in tests...
///
/// assert_eq!(store.listen_count(), 2);
/// assert_eq!(store.patches().len(), 1);
/// ```
pub struct ScriptedStore {
    scripts: Mutex<VecDeque<ListenScript>>,
    /// Fail every listen once the scripts run out (otherwise stay open, idle).
    fail_when_exhausted: bool,
    listen_calls: AtomicUsize,
    active: Arc<AtomicUsize>,
    patches: Mutex<Vec<Document>>,
    patch_failures: AtomicUsize,
    hang_patches: AtomicBool,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::with_exhausted_behaviour(false)
    }

    /// A store that refuses every subscription after its scripts.
    pub fn failing() -> Self {
        Self::with_exhausted_behaviour(true)
    }

    fn with_exhausted_behaviour(fail_when_exhausted: bool) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            fail_when_exhausted,
            listen_calls: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            patches: Mutex::new(Vec::new()),
            patch_failures: AtomicUsize::new(0),
            hang_patches: AtomicBool::new(false),
        }
    }

    pub fn push(&self, script: ListenScript) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Fail the next `n` patches.
    pub fn fail_patches(&self, n: usize) {
        self.patch_failures.store(n, Ordering::SeqCst);
    }

    /// Make every patch hang forever.
    pub fn hang_patches(&self) {
        self.hang_patches.store(true, Ordering::SeqCst);
    }

    pub fn listen_count(&self) -> usize {
        self.listen_calls.load(Ordering::SeqCst)
    }

    /// Subscriptions handed out and not yet dropped.
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Successfully applied patches, as JSON.
    pub fn patches(&self) -> Vec<Value> {
        self.patches
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(Document::into_value)
            .collect()
    }

    fn next_script(&self) -> ListenScript {
        match self.scripts.lock().unwrap().pop_front() {
            Some(script) => script,
            None if self.fail_when_exhausted => ListenScript::Fail("store unavailable".to_string()),
            None => ListenScript::items(Vec::new()),
        }
    }
}

impl Default for ScriptedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowStore for ScriptedStore {
    fn listen(&self, _thing: &str) -> BoxFuture<'_, SnapshotStream> {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.next_script();

        Box::pin(async move {
            match script {
                ListenScript::Fail(msg) => Err(AdapterError::transport_msg("listen", msg)),
                ListenScript::Stream { items, end } => {
                    let delivered = stream::iter(items.into_iter().map(Item::into_result));
                    let inner: SnapshotStream = if end {
                        delivered.boxed()
                    } else {
                        delivered.chain(stream::pending()).boxed()
                    };

                    self.active.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::pin(Tracked {
                        inner,
                        active: Arc::clone(&self.active),
                    }) as SnapshotStream)
                }
            }
        })
    }

    fn patch(&self, thing: &str, patch: Document) -> BoxFuture<'_, ()> {
        let thing = thing.to_string();
        Box::pin(async move {
            if self.hang_patches.load(Ordering::SeqCst) {
                futures::future::pending::<()>().await;
            }

            let remaining = self.patch_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.patch_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(AdapterError::Publish {
                    thing,
                    message: "injected failure".to_string(),
                });
            }

            self.patches.lock().unwrap().push(patch);
            Ok(())
        })
    }
}
