//! Monotonic millisecond clock used to timestamp call records.

use tokio::time::Instant;

/// Millisecond clock that never runs backwards.
///
/// Readings are the wall-clock Unix time captured at construction plus the
/// monotonic time elapsed since, so they look like ordinary timestamps to
/// subscribers while staying immune to wall-clock adjustments. Uses the Tokio
/// clock, so paused-time tests observe virtual time.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
    origin_unix_ms: u64,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self::with_origin(unix_now_ms())
    }

    /// Creates a clock whose first reading is `origin_unix_ms`.
    #[must_use]
    pub fn with_origin(origin_unix_ms: u64) -> Self {
        Self { origin: Instant::now(), origin_unix_ms }
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.origin_unix_ms.saturating_add(elapsed)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Current wall-clock time as Unix milliseconds.
#[must_use]
pub fn unix_now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
