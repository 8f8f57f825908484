// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Shadow store integration.
//!
//! Defines the interface the adapter needs from the document broker: a
//! subscription that yields full snapshots of one thing, and a merge-patch
//! write. Two implementations ship with the crate:
//!
//! - [`HttpStore`]: the broker's REST surface (`/reports/{thing}`)
//! - [`MemoryStore`]: an in-process store with broadcast fan-out
//!
//! # Example
//!
//! ```rust,no_run
//! use vss_path_adapter::store::{BoxFuture, ShadowStore, SnapshotStream};
//! use vss_path_adapter::Document;
//! use futures::stream;
//!
//! struct NullStore;
//!
//! impl ShadowStore for NullStore {
//!     fn listen(&self, _thing: &str) -> BoxFuture<'_, SnapshotStream> {
//!         Box::pin(async move {
//!             Ok(Box::pin(stream::pending::<vss_path_adapter::Result<Document>>()) as SnapshotStream)
//!         })
//!     }
//!
//!     fn patch(&self, _thing: &str, _patch: Document) -> BoxFuture<'_, ()> {
//!         Box::pin(async move { Ok(()) })
//!     }
//! }
//! ```

mod http;
mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::document::Document;
use crate::error::Result;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for boxed async futures (keeps the trait object-safe).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A live subscription: each item is a full snapshot of the thing.
///
/// An `Err` item reports a problem with one delivery. The stream ending means
/// the subscription is gone and the caller must resubscribe.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Document>> + Send + 'static>>;

/// What the adapter needs from the document broker.
///
/// Implementations must be cheap to share; the adapter holds one behind an
/// `Arc` and uses it from both the consumer and the publisher.
pub trait ShadowStore: Send + Sync + 'static {
    /// Open a subscription to `thing`.
    ///
    /// Fails with a retryable error if the broker cannot be reached.
    fn listen(&self, thing: &str) -> BoxFuture<'_, SnapshotStream>;

    /// Merge `patch` into the document for `thing`.
    fn patch(&self, thing: &str, patch: Document) -> BoxFuture<'_, ()>;
}

impl<S: ShadowStore + ?Sized> ShadowStore for Arc<S> {
    fn listen(&self, thing: &str) -> BoxFuture<'_, SnapshotStream> {
        (**self).listen(thing)
    }

    fn patch(&self, thing: &str, patch: Document) -> BoxFuture<'_, ()> {
        (**self).patch(thing, patch)
    }
}
