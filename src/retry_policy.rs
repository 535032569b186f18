//! Retry policy shared by the worksheet store boundary and the annotation engine.
//!
//! Implements capped exponential backoff. The delay is a pure function of the
//! attempt number so it can be tested without touching the network.

use crate::config::RetrySettings;
use std::time::Duration;

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay (cap for exponential growth).
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Create a new RetryPolicy from configuration settings.
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            max_delay: Duration::from_millis(settings.backoff_cap_ms),
            backoff_multiplier: 2.0,
        }
    }

    /// Delay to observe before retry number `retry` (0-based).
    ///
    /// `base_delay * multiplier^retry`, capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let millis = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Whether a failure with the given retryability may be retried after
    /// `retries_so_far` retries have already been spent.
    pub fn should_retry(&self, retryable: bool, retries_so_far: u32) -> bool {
        retryable && retries_so_far < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}
