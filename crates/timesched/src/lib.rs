//! # timesched
//!
//! Single-process, in-memory time-event scheduler: oneshot and repeat
//! timers with priority ordering and day-of-week filtering, dispatched at
//! local wall-clock moments.
//!
//! ## Design
//! - In-memory only — no queues, no database, nothing survives a restart
//! - Single-threaded cooperative dispatch — callbacks run to completion,
//!   one at a time, and may re-enter the scheduler to cancel or register
//! - Injectable clock — drive the run loop with virtual time in tests
//!
//! ## Architecture
//! ```text
//! Scheduler (run loop: sleep until due → dispatch → re-arm repeats)
//!   ├── TimeSpec / PeriodSpec: "in 5s", "at 2026-08-10 14:00", "daily 10:30"
//!   ├── DaySet: "MTWTFss" → {Mon..Fri}, next-occurrence walk
//!   └── EventStore: pending events ordered by (due, priority, seq)
//! ```
//!
//! ## Example
//! ```no_run
//! use timesched::Scheduler;
//!
//! let mut s = Scheduler::new();
//! s.oneshot(5u32, 0, |_| {
//!     println!("five seconds later");
//!     Ok(())
//! })?;
//! s.run(true)?;
//! # Ok::<(), timesched::SchedulerError>(())
//! ```

pub mod clock;
pub mod days;
pub mod error;
mod event;
pub mod schedule;
pub mod scheduler;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use days::{DAYS_STRING, DaySet, next_occurrence, parse_days};
pub use error::{Result, SchedulerError};
pub use event::EventId;
pub use schedule::{PeriodSpec, TimeSpec};
pub use scheduler::Scheduler;
