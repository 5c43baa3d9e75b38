//! Injected time source.
//!
//! Production uses `SystemClock`, tests use `FixedClock` so that checkout
//! session expiry, webhook signature tolerance and review timestamps are
//! deterministic.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests.
///
/// Clones share the same instant, so a test can keep a handle and
/// [`advance`](Self::advance) the clock the server is using.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(RwLock::new(time)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut time) = self.time.write() {
            *time += by;
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut time) = self.time.write() {
            *time = to;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
            .read()
            .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_735_689_600))
}
