//! Shared test utilities for integration and chaos tests.
//!
//! This module provides:
//! - A scripted ShadowStore for recording patches and injecting failures
//! - A broker REST stub for HttpStore tests
//! - Polling helpers and adapter construction

#![allow(dead_code)]

pub mod http_stub;
pub mod mock_store;

pub use http_stub::*;
pub use mock_store::*;

use std::sync::Arc;
use std::time::Duration;
use vss_path_adapter::{AdapterConfig, PathAdapter, ShadowStore, TranslationTable};

/// Poll `check` every 5ms until it holds or `timeout` passes.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Adapter on thing "vss" with the built-in table and fast timings.
pub fn test_adapter<S: ShadowStore>(store: Arc<S>) -> PathAdapter<S> {
    PathAdapter::new(
        AdapterConfig::for_testing("vss"),
        TranslationTable::builtin().unwrap(),
        store,
    )
    .unwrap()
}
