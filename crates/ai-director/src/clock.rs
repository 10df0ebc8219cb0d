//! Time sources for frame budgeting.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time since the clock was created.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time via `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual clock advanced by hand.
///
/// Clones share the same time, so a test can keep one handle and give another to agent logic
/// that "spends" time by advancing it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.set(self.nanos.get().saturating_add(by));
    }

    pub fn advance_ms(&self, ms: f64) {
        self.advance(Duration::from_secs_f64(ms.max(0.0) / 1000.0));
    }

    pub fn set(&self, at: Duration) {
        self.nanos.set(u64::try_from(at.as_nanos()).unwrap_or(u64::MAX));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.get())
    }
}

pub(crate) fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
