//! Mock clock for deterministic expiry tests
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use restprobe_common::testing::MockClock;
//! use restprobe_common::Clock;
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//!
//! // Simulate 5 seconds passing
//! clock.advance(Duration::from_secs(5));
//!
//! assert_eq!((clock.now() - start).num_seconds(), 5);
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::time::{whole_seconds, Clock};

/// Clock that only moves when told to.
///
/// Clones share the same elapsed time, so a test can keep one handle and
/// give another to the code under test.
#[derive(Debug, Clone)]
pub struct MockClock {
    base: DateTime<Utc>,
    elapsed: Arc<Mutex<chrono::Duration>>,
}

impl MockClock {
    /// Start at the current real time, truncated to whole seconds.
    #[must_use]
    pub fn new() -> Self {
        Self::at(whole_seconds(Utc::now()))
    }

    /// Start at a fixed instant.
    #[must_use]
    pub fn at(base: DateTime<Utc>) -> Self {
        Self { base, elapsed: Arc::new(Mutex::new(chrono::Duration::zero())) }
    }

    /// Simulate time passing.
    pub fn advance(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        let mut elapsed = self.elapsed.lock();
        *elapsed = elapsed.checked_add(&step).unwrap_or(chrono::Duration::MAX);
    }

    /// Move the clock backwards, e.g. to simulate skew.
    pub fn rewind(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        let mut elapsed = self.elapsed.lock();
        *elapsed = elapsed.checked_sub(&step).unwrap_or(chrono::Duration::MIN);
    }

    /// Total simulated offset from the starting instant.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.base.checked_add_signed(*self.elapsed.lock()).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing::time.
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn advance_and_rewind() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let clock = MockClock::at(start);

        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(90));

        clock.rewind(Duration::from_secs(30));
        assert_eq!(clock.elapsed(), chrono::Duration::seconds(60));
    }

    #[test]
    fn clones_share_time() {
        let clock = MockClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_secs(10));
        assert_eq!(clock.elapsed(), chrono::Duration::seconds(10));
    }

    #[test]
    fn new_starts_on_a_whole_second() {
        assert_eq!(MockClock::new().now().timestamp_subsec_nanos(), 0);
    }
}
