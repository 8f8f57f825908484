// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the path adapter.
//!
//! Configuration is passed to [`PathAdapter::new()`](crate::PathAdapter::new)
//! and can be constructed programmatically, deserialized from JSON, or read
//! from the process environment with [`AdapterConfig::from_env()`].
//! It is validated once at startup; there is no hot reload.
//!
//! # Configuration Structure
//!
//! ```text
//! AdapterConfig
//! ├── store: StoreConfig           # Broker address and thing name
//! ├── stream: StreamConfig         # Resubscribe backoff
//! ├── drain_timeout: "5s"          # Bounded wait in stop()
//! └── translation_table: Option    # JSON table file (built-in table if unset)
//! ```
//!
//! # Environment
//!
//! | Variable | Default | Field |
//! |----------|---------|-------|
//! | `QUAD_REST_URL` | `http://127.0.0.1:50050` | `store.url` |
//! | `VSS_THING_NAME` | `vss` | `store.thing` |
//! | `VSS_POLL_INTERVAL` | `500ms` | `store.poll_interval` |
//! | `VSS_REQUEST_TIMEOUT` | `5s` | `store.request_timeout` |
//! | `VSS_MAX_BACKOFF` | `5s` | `stream.max_backoff` |
//! | `VSS_TRANSLATION_TABLE` | unset | `translation_table` |

use crate::error::{AdapterError, Result};
use crate::resilience::RetryConfig;
use crate::translate::TranslationTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object passed to `PathAdapter::new()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Where the shadow store lives and which document to relay.
    pub store: StoreConfig,

    /// Subscription retry behaviour.
    #[serde(default)]
    pub stream: StreamConfig,

    /// How long `stop()` waits for the worker to drain (e.g. "5s").
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout: String,

    /// Optional JSON translation table file. The built-in table is used if unset.
    #[serde(default)]
    pub translation_table: Option<String>,
}

fn default_drain_timeout() -> String {
    "5s".to_string()
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            stream: StreamConfig::default(),
            drain_timeout: default_drain_timeout(),
            translation_table: None,
        }
    }
}

impl AdapterConfig {
    /// Create a config with fast timings for tests.
    pub fn for_testing(thing: &str) -> Self {
        Self {
            store: StoreConfig {
                thing: thing.to_string(),
                poll_interval: "20ms".to_string(),
                request_timeout: "1s".to_string(),
                ..StoreConfig::default()
            },
            stream: StreamConfig {
                initial_backoff: "10ms".to_string(),
                max_backoff: "100ms".to_string(),
                backoff_factor: 2.0,
            },
            drain_timeout: "2s".to_string(),
            translation_table: None,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("QUAD_REST_URL") {
            config.store.url = url;
        }
        if let Some(thing) = lookup("VSS_THING_NAME") {
            config.store.thing = thing;
        }
        if let Some(interval) = lookup("VSS_POLL_INTERVAL") {
            config.store.poll_interval = interval;
        }
        if let Some(timeout) = lookup("VSS_REQUEST_TIMEOUT") {
            config.store.request_timeout = timeout;
        }
        if let Some(backoff) = lookup("VSS_MAX_BACKOFF") {
            config.stream.max_backoff = backoff;
        }
        config.translation_table = lookup("VSS_TRANSLATION_TABLE").filter(|p| !p.is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the adapter must not start with.
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.stream.validate()?;
        parse_positive("drain_timeout", &self.drain_timeout)?;
        Ok(())
    }

    /// Parsed drain timeout (falls back to 5s if unparsable).
    pub fn drain_timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.drain_timeout).unwrap_or(Duration::from_secs(5))
    }

    /// Load the configured translation table, or the built-in one.
    pub fn load_table(&self) -> Result<TranslationTable> {
        match &self.translation_table {
            Some(path) => TranslationTable::from_file(path),
            None => TranslationTable::builtin(),
        }
    }
}

fn parse_positive(field: &str, value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value).map_err(|e| {
        AdapterError::Config(format!("{} '{}' is not a duration: {}", field, value, e))
    })?;
    if duration.is_zero() {
        return Err(AdapterError::Config(format!("{} must be greater than zero", field)));
    }
    Ok(duration)
}

// ═══════════════════════════════════════════════════════════════════════════════
// StoreConfig
// ═══════════════════════════════════════════════════════════════════════════════

/// Shadow store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the broker's REST surface.
    /// Example: `"http://127.0.0.1:50050"`
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Name of the document to relay.
    #[serde(default = "default_thing")]
    pub thing: String,

    /// Interval between snapshot fetches on the HTTP subscription.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Per-request timeout for subscribe and patch calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

fn default_store_url() -> String {
    "http://127.0.0.1:50050".to_string()
}

fn default_thing() -> String {
    "vss".to_string()
}

fn default_poll_interval() -> String {
    "500ms".to_string()
}

fn default_request_timeout() -> String {
    "5s".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            thing: default_thing(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl StoreConfig {
    pub fn poll_interval_duration(&self) -> Duration {
        humantime::parse_duration(&self.poll_interval).unwrap_or(Duration::from_millis(500))
    }

    pub fn request_timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.request_timeout).unwrap_or(Duration::from_secs(5))
    }

    fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.url).map_err(|e| {
            AdapterError::Config(format!("store url '{}' is invalid: {}", self.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AdapterError::Config(format!(
                "store url '{}' must use http or https",
                self.url
            )));
        }
        if self.thing.trim().is_empty() {
            return Err(AdapterError::Config("thing name is empty".to_string()));
        }
        if self.thing.contains('/') {
            return Err(AdapterError::Config(format!(
                "thing name '{}' must not contain '/'",
                self.thing
            )));
        }
        parse_positive("poll_interval", &self.poll_interval)?;
        parse_positive("request_timeout", &self.request_timeout)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// StreamConfig
// ═══════════════════════════════════════════════════════════════════════════════

/// Resubscribe backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff: String,

    /// Ceiling for the exponential backoff. Kept to a few seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff: String,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_initial_backoff() -> String {
    "200ms".to_string()
}

fn default_max_backoff() -> String {
    "5s".to_string()
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl StreamConfig {
    /// Backoff schedule for the stream consumer.
    pub fn retry_config(&self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig {
            initial_delay: humantime::parse_duration(&self.initial_backoff)
                .unwrap_or(defaults.initial_delay),
            max_delay: humantime::parse_duration(&self.max_backoff).unwrap_or(defaults.max_delay),
            backoff_factor: self.backoff_factor,
        }
    }

    fn validate(&self) -> Result<()> {
        let initial = parse_positive("initial_backoff", &self.initial_backoff)?;
        let max = parse_positive("max_backoff", &self.max_backoff)?;
        if initial > max {
            return Err(AdapterError::Config(format!(
                "initial_backoff {} exceeds max_backoff {}",
                self.initial_backoff, self.max_backoff
            )));
        }
        if !(self.backoff_factor >= 1.0 && self.backoff_factor.is_finite()) {
            return Err(AdapterError::Config(format!(
                "backoff_factor must be a finite number >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
