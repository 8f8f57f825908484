// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resilience utilities: bounded exponential backoff and cancellable waits.
//!
//! - [`RetryConfig`]: Backoff schedule for resubscribing to the store
//! - [`Backoff`]: Stateful cursor over that schedule
//! - [`sleep_or_shutdown`]: A backoff sleep that a stop request cuts short
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() {
//! use vss_path_adapter::resilience::{Backoff, RetryConfig, sleep_or_shutdown};
//! use tokio::sync::watch;
//!
//! let (_stop_tx, mut stop_rx) = watch::channel(false);
//! let mut backoff = Backoff::new(RetryConfig::default());
//!
//! let delay = backoff.next_delay();
//! if sleep_or_shutdown(delay, &mut stop_rx).await {
//!     return; // stop requested during backoff
//! }
//! # }
//! ```

use std::time::Duration;
use tokio::sync::watch;

/// Configuration for resubscribe backoff.
///
/// Retries are unlimited: store unavailability is expected to be temporary.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial delay before first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (ceiling for exponential backoff).
    pub max_delay: Duration,

    /// Backoff multiplier (e.g., 2.0 = double delay each retry).
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    /// 200ms, doubling, capped at 5 seconds.
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Fast retry for tests.
    pub fn testing() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
        }
    }

    /// Calculate delay for a given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let multiplier = self.backoff_factor.powi(exponent);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }

        std::cmp::min(Duration::from_secs_f64(delay_secs), self.max_delay)
    }
}

/// Position in a backoff schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    attempt: usize,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Advance and return the delay for the next retry.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.config.delay_for_attempt(self.attempt)
    }

    /// Consecutive failures since the last reset.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// Return to the initial delay after a success.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Resolve once a stop has been requested on `shutdown_rx`.
///
/// A dropped sender counts as a stop request.
pub async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Sleep for `delay` unless a stop is requested first.
///
/// Returns `true` if the sleep was cut short by a stop request.
pub async fn sleep_or_shutdown(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;
        _ = shutdown_requested(shutdown_rx) => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.initial_delay, Duration::from_millis(200));
        assert_eq!(config.max_delay, Duration::from_secs(5));
        assert_eq!(config.backoff_factor, 2.0);
    }

    #[test]
    fn test_delay_for_attempt() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(20), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(usize::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_advances_and_resets() {
        let mut backoff = Backoff::new(RetryConfig::testing());
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        assert_eq!(backoff.next_delay(), Duration::from_millis(40));
        assert_eq!(backoff.attempt(), 3);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_sleep_completes_without_shutdown() {
        let (_tx, mut rx) = watch::channel(false);
        let interrupted = sleep_or_shutdown(Duration::from_millis(10), &mut rx).await;
        assert!(!interrupted);
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let start = Instant::now();
        let interrupted = sleep_or_shutdown(Duration::from_secs(30), &mut rx).await;
        assert!(interrupted);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        assert!(sleep_or_shutdown(Duration::from_secs(30), &mut rx).await);
    }
}
