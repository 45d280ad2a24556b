//! Sliding-window rate limiter guarding outbound RPC calls.
//!
//! Grants at most `max_requests` permissions inside any trailing `window`.
//! Callers await [`RateLimiter::acquire`]; when the window is full the caller
//! sleeps until the oldest grant leaves the window (capped by
//! `max_poll_interval`) and retries, giving up once `max_wait` is exceeded.

use parking_lot::Mutex;
use std::{collections::VecDeque, time::Duration};
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{trace, warn};

/// Shortest sleep between attempts, so a zero-length delay never spins.
const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Configuration for [`RateLimiter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum permissions granted inside one window
    pub max_requests: usize,
    /// Length of the trailing window
    pub window: Duration,
    /// Default wait budget for [`RateLimiter::acquire`]
    pub max_wait: Duration,
    /// Upper bound on a single sleep between attempts
    pub max_poll_interval: Duration,
    /// Added to the computed delay so the retry lands after the slot frees up
    pub safety_buffer: Duration,
}

impl RateLimiterConfig {
    /// Creates a configuration with `max_wait` set to twice the window.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            max_wait: window.saturating_mul(2),
            max_poll_interval: Duration::from_secs(1),
            safety_buffer: Duration::from_millis(50),
        }
    }

    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(300, Duration::from_secs(10))
    }
}

/// Errors returned by [`RateLimiter`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RateLimitError {
    /// No slot became free within the wait budget.
    #[error(
        "rate limiter timed out after {waited_ms}ms (max {max_requests} requests per {window_ms}ms)"
    )]
    Timeout { max_requests: usize, window_ms: u64, waited_ms: u64 },
}

/// Sliding-window rate limiter.
///
/// Grant timestamps live behind one mutex; pruning, the capacity check and the
/// push of a new grant all happen under that lock, so concurrent acquirers can
/// never both claim the last slot. The lock is never held across an `.await`.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        let grants = Mutex::new(VecDeque::with_capacity(config.max_requests.min(4096)));
        Self { config, grants }
    }

    /// Waits for a permission using the configured `max_wait`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Timeout`] if no slot frees up in time.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        self.acquire_with_timeout(self.config.max_wait).await
    }

    /// Waits for a permission, giving up after `max_wait`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Timeout`] if no slot frees up in time.
    pub async fn acquire_with_timeout(&self, max_wait: Duration) -> Result<(), RateLimitError> {
        let started = Instant::now();

        loop {
            let Some(delay) = self.try_acquire_at(Instant::now()) else {
                return Ok(());
            };

            let waited = started.elapsed();
            if waited >= max_wait {
                let error = RateLimitError::Timeout {
                    max_requests: self.config.max_requests,
                    window_ms: duration_ms(self.config.window),
                    waited_ms: duration_ms(waited),
                };
                warn!(
                    max_requests = self.config.max_requests,
                    window_ms = duration_ms(self.config.window),
                    waited_ms = duration_ms(waited),
                    "rate limiter wait budget exhausted"
                );
                return Err(error);
            }

            let nap = delay
                .min(self.config.max_poll_interval)
                .min(max_wait - waited)
                .max(MIN_RETRY_DELAY);
            trace!(delay_ms = duration_ms(nap), "rate limit reached, waiting for a free slot");
            sleep(nap).await;
        }
    }

    /// Number of grants still inside the trailing window.
    #[must_use]
    pub fn current_count(&self) -> usize {
        let now = Instant::now();
        self.grants
            .lock()
            .iter()
            .filter(|granted| now.saturating_duration_since(**granted) < self.config.window)
            .count()
    }

    /// Forgets every grant.
    pub fn reset(&self) {
        self.grants.lock().clear();
    }

    /// Prunes expired grants and claims a slot if one is free.
    ///
    /// Returns `None` on success, otherwise how long until the oldest grant
    /// leaves the window (plus the safety buffer).
    fn try_acquire_at(&self, now: Instant) -> Option<Duration> {
        let window = self.config.window;
        let mut grants = self.grants.lock();

        while grants.front().is_some_and(|oldest| now.saturating_duration_since(*oldest) >= window)
        {
            grants.pop_front();
        }

        if grants.len() < self.config.max_requests {
            grants.push_back(now);
            return None;
        }

        let until_free = grants
            .front()
            .map_or(self.config.max_poll_interval, |oldest| {
                (*oldest + window).saturating_duration_since(now)
            });
        Some(until_free + self.config.safety_buffer)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
