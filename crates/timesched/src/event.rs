//! Event records — the unit of scheduling held by the pending store.

use std::fmt;

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::days::DaySet;
use crate::scheduler::Scheduler;

/// Opaque handle to a registered event, used for cancellation.
///
/// Ids are monotonically increasing and never reused by a scheduler
/// instance, so a stale handle can never cancel somebody else's event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub(crate) u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happens to an event after it fires.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EventKind {
    /// Fire once, then discard.
    OneShot,
    /// Re-arm at `completion + period`; callback runtime stretches the gap.
    Every(Duration),
    /// Re-arm at the next day showing this wall-clock time, measured from
    /// the previous due instant so the cadence survives late dispatch.
    Daily(NaiveTime),
    /// As `Daily`, constrained to the given weekdays.
    OnDays { time: NaiveTime, days: DaySet },
}

/// User action invoked when an event fires. The `&mut Scheduler` parameter
/// lets callbacks cancel and register events mid-run.
pub(crate) type Callback = Box<dyn FnMut(&mut Scheduler) -> anyhow::Result<()>>;

/// A pending event.
pub(crate) struct Event {
    pub(crate) id: EventId,
    /// Absolute local instant at which the event becomes eligible to fire.
    pub(crate) due: NaiveDateTime,
    /// Lower fires first among events with equal due time.
    pub(crate) priority: i32,
    /// Insertion counter; breaks (due, priority) ties in FIFO order.
    pub(crate) seq: u64,
    pub(crate) kind: EventKind,
    pub(crate) callback: Callback,
}
