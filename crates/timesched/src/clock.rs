//! Time sources — the wall clock and sleep primitive are injectable so the
//! run loop can be driven by virtual time in tests and simulations.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};

/// Source of current local time plus the primitive used to wait for it.
///
/// The scheduler deliberately reads the wall clock rather than a monotonic
/// one: time-of-day and day-of-week computations must agree with the
/// calendar. The cost is sensitivity to system clock adjustments.
pub trait Clock {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Block for roughly `duration`. Waking early or late is fine; the run
    /// loop re-checks due times after every wake.
    fn sleep(&self, duration: Duration);
}

/// The default clock — system local time and `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A virtual clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can hold one handle
/// while the scheduler owns another. `sleep` advances the clock instead of
/// blocking, which makes a blocking run loop complete instantly.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<NaiveDateTime>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> NaiveDateTime {
        self.now.get()
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: NaiveDateTime) {
        self.now.set(to);
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(delta) = TimeDelta::from_std(duration) {
            self.advance(delta);
        }
    }
}
