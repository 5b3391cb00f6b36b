//! Schedule specifications — the time/period arguments accepted by
//! registration calls and their normalization to absolute due instants.
//!
//! `TimeSpec` covers one-shot events; `PeriodSpec` covers repeats. They are
//! separate unions because a repeat pinned to one absolute instant makes no
//! sense, so the absolute forms are simply not representable as periods.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::days::{self, DaySet};
use crate::error::{Result, SchedulerError};

/// When a one-shot event should fire.
///
/// Usually built implicitly through a `From` conversion: plain numbers and
/// durations mean "this many seconds from now", a [`NaiveTime`] means "the
/// next time the wall clock shows this", a [`NaiveDateTime`] is taken
/// as-is, and a [`NaiveDate`] means midnight starting that date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeSpec {
    /// Relative delay in seconds from now.
    Delay { secs: f64 },
    /// Absolute local date-time, used as-is. Instants in the past are not
    /// an error; the event fires on the next run-loop pass.
    At { at: NaiveDateTime },
    /// Next occurrence of this time of day; already passed today rolls to
    /// tomorrow.
    AtTime { time: NaiveTime },
    /// Midnight at the start of this date.
    OnDate { date: NaiveDate },
}

impl TimeSpec {
    /// Resolve to the absolute instant the event becomes due.
    pub fn resolve(self, now: NaiveDateTime) -> Result<NaiveDateTime> {
        match self {
            TimeSpec::Delay { secs } => Ok(now + secs_delta(secs)),
            TimeSpec::At { at } => Ok(at),
            TimeSpec::AtTime { time } => days::next_occurrence(time, DaySet::ALL, now),
            TimeSpec::OnDate { date } => Ok(date.and_time(NaiveTime::MIN)),
        }
    }
}

impl From<u32> for TimeSpec {
    fn from(secs: u32) -> Self {
        TimeSpec::Delay {
            secs: f64::from(secs),
        }
    }
}

impl From<f64> for TimeSpec {
    fn from(secs: f64) -> Self {
        TimeSpec::Delay { secs }
    }
}

impl From<std::time::Duration> for TimeSpec {
    fn from(delay: std::time::Duration) -> Self {
        TimeSpec::Delay {
            secs: delay.as_secs_f64(),
        }
    }
}

impl From<Duration> for TimeSpec {
    fn from(delay: Duration) -> Self {
        TimeSpec::Delay {
            secs: delta_secs(delay),
        }
    }
}

impl From<NaiveDateTime> for TimeSpec {
    fn from(at: NaiveDateTime) -> Self {
        TimeSpec::At { at }
    }
}

impl From<NaiveTime> for TimeSpec {
    fn from(time: NaiveTime) -> Self {
        TimeSpec::AtTime { time }
    }
}

impl From<NaiveDate> for TimeSpec {
    fn from(date: NaiveDate) -> Self {
        TimeSpec::OnDate { date }
    }
}

/// How often a repeat event fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PeriodSpec {
    /// Every `secs` seconds, measured from the completion of the previous
    /// callback.
    Every { secs: f64 },
    /// Every day the wall clock shows this time.
    Daily { time: NaiveTime },
}

impl From<u32> for PeriodSpec {
    fn from(secs: u32) -> Self {
        PeriodSpec::Every {
            secs: f64::from(secs),
        }
    }
}

impl From<f64> for PeriodSpec {
    fn from(secs: f64) -> Self {
        PeriodSpec::Every { secs }
    }
}

impl From<std::time::Duration> for PeriodSpec {
    fn from(period: std::time::Duration) -> Self {
        PeriodSpec::Every {
            secs: period.as_secs_f64(),
        }
    }
}

impl From<Duration> for PeriodSpec {
    fn from(period: Duration) -> Self {
        PeriodSpec::Every {
            secs: delta_secs(period),
        }
    }
}

impl From<NaiveTime> for PeriodSpec {
    fn from(time: NaiveTime) -> Self {
        PeriodSpec::Daily { time }
    }
}

/// Seconds to a signed delta, at millisecond resolution.
pub(crate) fn secs_delta(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

fn delta_secs(delta: Duration) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

/// Validate and convert a relative repeat period.
///
/// Anything that does not move time forward would re-arm into an
/// immediately-due event and spin the dispatch loop.
pub(crate) fn period_delta(secs: f64) -> Result<Duration> {
    let delta = secs_delta(secs);
    if !secs.is_finite() || delta <= Duration::zero() {
        return Err(SchedulerError::InvalidSpec(format!(
            "repeat period must be a positive number of seconds, got {secs}"
        )));
    }
    Ok(delta)
}
