// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # VSS Path Adapter
//!
//! A path-translation relay between COVESA VSS paths and a custom vehicle
//! data model living in the same shadow document.
//!
//! ## Architecture
//!
//! The adapter subscribes to one thing on the shadow store, rewrites the
//! leaves listed in its translation table, and patches the rewritten leaves
//! back into the same thing:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                             vss-path-adapter                              │
//! │                                                                           │
//! │  ┌────────────────┐    ┌─────────┐    ┌───────────┐    ┌──────────────┐   │
//! │  │ StreamConsumer │───►│ flatten │───►│ translate │───►│ tree::build  │   │
//! │  │ (resubscribes) │    │ (leaves)│    │ (table)   │    │ (patch)      │   │
//! │  └────────────────┘    └─────────┘    └───────────┘    └──────────────┘   │
//! │          ▲                                                    │           │
//! │          │                                                    ▼           │
//! │  ┌────────────────┐                                    ┌──────────────┐   │
//! │  │  ShadowStore   │◄───────────────────────────────────│  Publisher   │   │
//! │  │ (listen/patch) │                                    │ (merge patch)│   │
//! │  └────────────────┘                                    └──────────────┘   │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feedback
//!
//! Published leaves come back in the next snapshot. The translation table is
//! rejected at load time if any destination path overlaps any source path, so
//! those echoed leaves never translate again. Stores only notify on change,
//! so republishing an unchanged patch ends the echo.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vss_path_adapter::{AdapterConfig, HttpStore, PathAdapter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> vss_path_adapter::Result<()> {
//!     let config = AdapterConfig::from_env()?;
//!     let table = config.load_table()?;
//!     let store = Arc::new(HttpStore::new(&config.store)?);
//!
//!     let adapter = PathAdapter::new(config, table, store)?;
//!     adapter.start().await?;
//!
//!     // Adapter runs until stopped
//!     adapter.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod flatten;
pub mod metrics;
pub mod path;
pub mod publisher;
pub mod resilience;
pub mod store;
pub mod stream;
pub mod translate;
pub mod tree;

// Re-exports for convenience
pub use config::{AdapterConfig, StoreConfig, StreamConfig};
pub use coordinator::{translate_snapshot, AdapterState, AdapterStats, PathAdapter};
pub use document::{Document, Scalar};
pub use error::{AdapterError, Result};
pub use flatten::{flatten, LeafUpdate};
pub use path::{normalize, Path};
pub use publisher::Publisher;
pub use resilience::RetryConfig;
pub use store::{HttpStore, MemoryStore, ShadowStore};
pub use stream::{ConsumerState, StreamConsumer};
pub use translate::{TranslationEntry, TranslationTable};
