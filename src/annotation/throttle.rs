//! Request-rate throttling for model calls.
//!
//! Enforces a global ceiling on model requests per sliding window,
//! independent of how many calls are in flight.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Trait for model request throttling.
#[async_trait]
pub trait RequestThrottler: Send + Sync {
    /// Take a request slot if one is free in the current window.
    /// Returns Err(wait_duration) if throttled.
    async fn try_acquire(&self) -> Result<(), Duration>;

    /// Get current usage stats for monitoring.
    async fn get_stats(&self) -> ThrottleStats;
}

/// Wait until the throttler hands out a slot.
pub async fn acquire(throttler: &dyn RequestThrottler) {
    while let Err(wait) = throttler.try_acquire().await {
        debug!(wait_ms = wait.as_millis() as u64, "Request ceiling reached, waiting");
        tokio::time::sleep(wait).await;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    pub requests_in_window: u32,
    pub max_requests: u32,
    pub is_throttled: bool,
}

#[derive(Debug, Clone)]
pub struct ThrottlerConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl ThrottlerConfig {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

/// Sliding window request throttler.
pub struct SlidingWindowThrottler {
    requests: Mutex<VecDeque<Instant>>,
    config: ThrottlerConfig,
}

impl SlidingWindowThrottler {
    pub fn new(config: ThrottlerConfig) -> Self {
        Self {
            requests: Mutex::new(VecDeque::new()),
            config,
        }
    }

    fn prune(requests: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = requests.front() {
            if now.duration_since(*front) >= window {
                requests.pop_front();
            } else {
                break;
            }
        }
    }
}

#[async_trait]
impl RequestThrottler for SlidingWindowThrottler {
    async fn try_acquire(&self) -> Result<(), Duration> {
        let mut requests = self.requests.lock().await;
        let now = Instant::now();
        Self::prune(&mut requests, now, self.config.window);

        if requests.len() as u32 >= self.config.max_requests {
            // Wait until the oldest request leaves the window
            return match requests.front() {
                Some(oldest) => Err(self.config.window - now.duration_since(*oldest)),
                None => Err(self.config.window),
            };
        }

        requests.push_back(now);
        Ok(())
    }

    async fn get_stats(&self) -> ThrottleStats {
        let mut requests = self.requests.lock().await;
        Self::prune(&mut requests, Instant::now(), self.config.window);
        let requests_in_window = requests.len() as u32;
        ThrottleStats {
            requests_in_window,
            max_requests: self.config.max_requests,
            is_throttled: requests_in_window >= self.config.max_requests,
        }
    }
}

/// No-op throttler that always allows requests.
/// Used when the rate ceiling is disabled.
pub struct NoOpThrottler;

#[async_trait]
impl RequestThrottler for NoOpThrottler {
    async fn try_acquire(&self) -> Result<(), Duration> {
        Ok(())
    }

    async fn get_stats(&self) -> ThrottleStats {
        ThrottleStats::default()
    }
}
