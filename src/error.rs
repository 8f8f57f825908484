// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the path adapter.
//!
//! Errors are categorized by how the adapter reacts to them. Only
//! configuration errors are fatal, and only before the adapter starts.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Transport` | Yes | Subscription dropped, connection refused, timeouts |
//! | `Publish` | Yes | Store rejected the patch (next snapshot retries naturally) |
//! | `MalformedSnapshot` | No | Snapshot cannot be flattened, discarded |
//! | `Config` | No | Bad translation table or process configuration |
//! | `InvalidState` | No | Adapter state machine violation |
//!
//! # Retry Behavior
//!
//! Use [`AdapterError::is_retryable()`] to decide whether the stream consumer
//! should back off and resubscribe. Non-retryable errors are either scoped to
//! one snapshot or fatal at startup.

use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors that can occur while relaying paths.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Store transport failure.
    ///
    /// Occurs when the subscription drops or the store is unreachable.
    /// Retried with backoff for as long as the adapter is running.
    #[error("Transport error ({operation}): {message}")]
    Transport {
        operation: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The store refused a patch.
    ///
    /// Logged and dropped. The source value is still upstream, so the next
    /// snapshot republishes it.
    #[error("Publish error for thing '{thing}': {message}")]
    Publish { thing: String, message: String },

    /// A snapshot that cannot be decomposed into leaves.
    ///
    /// Scoped to one snapshot: it is discarded and the loop continues.
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Invalid translation table or process configuration.
    ///
    /// Fatal at startup - fix the configuration and restart.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Adapter state machine violation.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl AdapterError {
    /// Create a transport error from a reqwest error.
    pub fn transport(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a transport error without source.
    pub fn transport_msg(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Publish { .. } => true,
            Self::MalformedSnapshot(_) => false,
            Self::Config(_) => false,
            Self::InvalidState { .. } => false,
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        Self::transport("unknown", e)
    }
}
