// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Subscription health and reconnects
//! - Snapshot throughput and discards
//! - Translation hit rate
//! - Publish outcomes and latency
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `vss_adapter_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)
//!
//! No recorder is installed by this crate; without one every call is a no-op.
//!
//! # Usage
//!
//! ```rust,no_run
//! use vss_path_adapter::metrics;
//! use std::time::Duration;
//!
//! // After translating one snapshot
//! metrics::record_snapshot_translated("vss", 12, 4, Duration::from_micros(80));
//!
//! // After a patch round-trip
//! metrics::record_publish("vss", true, Duration::from_millis(3));
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// =============================================================================
// Subscription Metrics
// =============================================================================

/// Record a subscribe attempt.
pub fn record_subscribe(thing: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("vss_adapter_subscribes_total", "thing" => thing.to_string(), "status" => status).increment(1);
}

/// Record a resubscribe after a dropped or failed subscription.
pub fn record_reconnect(thing: &str, delay: Duration) {
    counter!("vss_adapter_reconnects_total", "thing" => thing.to_string()).increment(1);
    histogram!("vss_adapter_reconnect_delay_seconds", "thing" => thing.to_string())
        .record(delay.as_secs_f64());
}

/// Gauge for consumer state (0=disconnected, 1=connecting, 2=streaming, 3=backoff, 4=stopped).
pub fn set_consumer_state(thing: &str, state: &str) {
    let value = match state {
        "Disconnected" => 0.0,
        "Connecting" => 1.0,
        "Streaming" => 2.0,
        "Backoff" => 3.0,
        "Stopped" => 4.0,
        _ => -1.0,
    };
    gauge!("vss_adapter_consumer_state", "thing" => thing.to_string()).set(value);
}

// =============================================================================
// Snapshot Metrics
// =============================================================================

/// Record a snapshot delivered to the adapter.
pub fn record_snapshot_received(thing: &str) {
    counter!("vss_adapter_snapshots_total", "thing" => thing.to_string()).increment(1);
}

/// Record a snapshot that was dropped without translation.
pub fn record_snapshot_discarded(thing: &str, reason: &str) {
    counter!(
        "vss_adapter_snapshots_discarded_total",
        "thing" => thing.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record one snapshot's translation pass.
pub fn record_snapshot_translated(thing: &str, leaves: usize, translated: usize, duration: Duration) {
    let thing = thing.to_string();

    counter!("vss_adapter_leaves_seen_total", "thing" => thing.clone()).increment(leaves as u64);
    if translated > 0 {
        counter!("vss_adapter_leaves_translated_total", "thing" => thing.clone())
            .increment(translated as u64);
    }
    histogram!("vss_adapter_translate_duration_seconds", "thing" => thing)
        .record(duration.as_secs_f64());
}

// =============================================================================
// Publish Metrics
// =============================================================================

/// Record a patch round-trip.
pub fn record_publish(thing: &str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!("vss_adapter_publishes_total", "thing" => thing.to_string(), "status" => status).increment(1);
    histogram!("vss_adapter_publish_duration_seconds", "thing" => thing.to_string())
        .record(duration.as_secs_f64());
}

// =============================================================================
// Adapter Metrics
// =============================================================================

/// Record errors by type.
pub fn record_error(thing: &str, error_type: &str) {
    counter!("vss_adapter_errors_total", "thing" => thing.to_string(), "error_type" => error_type.to_string()).increment(1);
}

/// Gauge for adapter state.
pub fn set_adapter_state(state: &str) {
    let value = match state {
        "Created" => 0.0,
        "Running" => 1.0,
        "Stopping" => 2.0,
        "Stopped" => 3.0,
        _ => -1.0,
    };
    gauge!("vss_adapter_state").set(value);
}
