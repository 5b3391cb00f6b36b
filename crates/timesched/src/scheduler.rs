//! The scheduler — registration surface, cancellation, and the run loop
//! that sleeps until events come due and dispatches them in order.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};

use crate::clock::{Clock, SystemClock};
use crate::days::{DaySet, next_occurrence};
use crate::error::{Result, SchedulerError};
use crate::event::{Callback, Event, EventId, EventKind};
use crate::schedule::{self, PeriodSpec, TimeSpec};
use crate::store::EventStore;

/// A single-process, in-memory time-event scheduler.
///
/// Callbacks registered here run once or repeatedly at local wall-clock
/// moments, ordered by due time, then priority (lower first), then
/// registration order. Execution is single-threaded and cooperative:
/// [`Scheduler::run`] dispatches one callback at a time and a callback runs
/// to completion before the next event is considered. Callbacks receive
/// `&mut Scheduler` and may cancel or register events mid-run; such changes
/// take effect immediately.
pub struct Scheduler {
    store: EventStore,
    clock: Box<dyn Clock>,
    next_id: u64,
    next_seq: u64,
    /// Event whose callback is currently executing. Cleared by a
    /// mid-callback self-cancel, which suppresses re-arming.
    running: Option<EventId>,
}

impl Scheduler {
    /// Scheduler on the system wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Scheduler on an injected time source, e.g. a
    /// [`ManualClock`](crate::clock::ManualClock) for tests.
    pub fn with_clock<C: Clock + 'static>(clock: C) -> Self {
        Self {
            store: EventStore::new(),
            clock: Box::new(clock),
            next_id: 1,
            next_seq: 0,
            running: None,
        }
    }

    /// Register a one-shot event.
    ///
    /// `when` is anything convertible to a [`TimeSpec`]: seconds, a
    /// duration, a time of day, a date-time, or a date. Returns the handle
    /// used for [`Scheduler::cancel`].
    pub fn oneshot<T, F>(&mut self, when: T, priority: i32, callback: F) -> Result<EventId>
    where
        T: Into<TimeSpec>,
        F: FnMut(&mut Scheduler) -> anyhow::Result<()> + 'static,
    {
        let due = when.into().resolve(self.clock.now())?;
        Ok(self.register(due, priority, EventKind::OneShot, Box::new(callback)))
    }

    /// Register a repeat event.
    ///
    /// `period` is anything convertible to a [`PeriodSpec`]: seconds or a
    /// duration for a relative period, or a time of day for a daily repeat.
    pub fn repeat<P, F>(&mut self, period: P, priority: i32, callback: F) -> Result<EventId>
    where
        P: Into<PeriodSpec>,
        F: FnMut(&mut Scheduler) -> anyhow::Result<()> + 'static,
    {
        let now = self.clock.now();
        match period.into() {
            PeriodSpec::Every { secs } => {
                let period = schedule::period_delta(secs)?;
                Ok(self.register(
                    now + period,
                    priority,
                    EventKind::Every(period),
                    Box::new(callback),
                ))
            }
            PeriodSpec::Daily { time } => {
                let due = next_occurrence(time, DaySet::ALL, now)?;
                Ok(self.register(due, priority, EventKind::Daily(time), Box::new(callback)))
            }
        }
    }

    /// Register a one-shot event at `time` on the next allowed weekday.
    ///
    /// `days` is a [`DaySet`], a `"MTWTFss"`-style mask string, or weekday
    /// integers (0 = Monday).
    pub fn oneshot_on_days<D, F>(
        &mut self,
        days: D,
        time: NaiveTime,
        priority: i32,
        callback: F,
    ) -> Result<EventId>
    where
        D: TryInto<DaySet>,
        SchedulerError: From<D::Error>,
        F: FnMut(&mut Scheduler) -> anyhow::Result<()> + 'static,
    {
        let days: DaySet = days.try_into()?;
        let due = next_occurrence(time, days, self.clock.now())?;
        Ok(self.register(due, priority, EventKind::OneShot, Box::new(callback)))
    }

    /// Register a repeat event firing at `time` on each allowed weekday.
    pub fn repeat_on_days<D, F>(
        &mut self,
        days: D,
        time: NaiveTime,
        priority: i32,
        callback: F,
    ) -> Result<EventId>
    where
        D: TryInto<DaySet>,
        SchedulerError: From<D::Error>,
        F: FnMut(&mut Scheduler) -> anyhow::Result<()> + 'static,
    {
        let days: DaySet = days.try_into()?;
        let due = next_occurrence(time, days, self.clock.now())?;
        Ok(self.register(due, priority, EventKind::OnDays { time, days }, Box::new(callback)))
    }

    /// Cancel a pending event.
    ///
    /// Errors with [`SchedulerError::NotFound`] if the id is unknown,
    /// already fired (one-shot), or already cancelled. Cancelling the event
    /// whose callback is currently executing succeeds and stops a repeat
    /// from re-arming.
    pub fn cancel(&mut self, id: EventId) -> Result<()> {
        if self.store.remove(id).is_some() {
            tracing::info!("🗑️ event {id} cancelled");
            Ok(())
        } else if self.running == Some(id) {
            self.running = None;
            tracing::info!("🗑️ event {id} cancelled mid-dispatch");
            Ok(())
        } else {
            Err(SchedulerError::NotFound { id })
        }
    }

    /// Number of active events: pending ones plus the event whose callback
    /// is currently executing.
    pub fn count(&self) -> usize {
        self.store.len() + usize::from(self.running.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty() && self.running.is_none()
    }

    /// Due time of the earliest pending event.
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.store.next_due()
    }

    /// Dispatch events until done.
    ///
    /// Blocking mode sleeps until the earliest event is due, dispatches it,
    /// and returns once no events remain. Early wakeups are tolerated: due
    /// times are re-checked after every sleep. Non-blocking mode dispatches
    /// only events already due and returns without sleeping, even if events
    /// remain pending.
    ///
    /// A callback error propagates immediately as
    /// [`SchedulerError::Callback`]; the failing event is already removed
    /// and, for repeats, not re-armed. Call `run` again to keep dispatching
    /// the remaining events.
    pub fn run(&mut self, blocking: bool) -> Result<()> {
        while let Some(due) = self.store.next_due() {
            let now = self.clock.now();
            if due > now {
                if !blocking {
                    break;
                }
                let wait = (due - now).to_std().unwrap_or(std::time::Duration::ZERO);
                self.clock.sleep(wait);
                continue;
            }
            if let Some(event) = self.store.pop_if_due(now) {
                self.dispatch(event)?;
            }
        }
        Ok(())
    }

    fn register(
        &mut self,
        due: NaiveDateTime,
        priority: i32,
        kind: EventKind,
        callback: Callback,
    ) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::info!("📅 event {id} registered: due {due}, priority {priority}");
        self.store.insert(Event {
            id,
            due,
            priority,
            seq,
            kind,
            callback,
        });
        id
    }

    /// Run one event's callback, then re-arm repeat kinds.
    fn dispatch(&mut self, mut event: Event) -> Result<()> {
        tracing::debug!("🔔 event {} fired (due {})", event.id, event.due);
        let outer = self.running.replace(event.id);
        let outcome = (event.callback)(self);
        let still_active = self.running == Some(event.id);
        self.running = outer;
        outcome.map_err(SchedulerError::Callback)?;
        if !still_active {
            // Cancelled from inside its own callback.
            return Ok(());
        }
        let next = match event.kind {
            EventKind::OneShot => None,
            // Measured from completion, so callback runtime stretches the
            // gap between firings.
            EventKind::Every(period) => Some(self.clock.now() + period),
            // Measured from the previous due instant, so the daily cadence
            // survives late dispatch.
            EventKind::Daily(time) => Some(next_occurrence(time, DaySet::ALL, event.due)?),
            EventKind::OnDays { time, days } => Some(next_occurrence(time, days, event.due)?),
        };
        if let Some(due) = next {
            tracing::debug!("🔁 event {} re-armed for {due}", event.id);
            event.due = due;
            event.seq = self.next_seq;
            self.next_seq += 1;
            self.store.insert(event);
        }
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.store.len())
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Datelike, Duration, NaiveDate, Weekday};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    // 2026-08-04 is a Tuesday.
    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn virtual_sched() -> (ManualClock, Scheduler) {
        let clock = ManualClock::new(start());
        let sched = Scheduler::with_clock(clock.clone());
        (clock, sched)
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_count_lifecycle() {
        let (_clock, mut sched) = virtual_sched();
        assert_eq!(sched.count(), 0);

        let id = sched.oneshot(5u32, 0, |_| Ok(())).unwrap();
        assert_eq!(sched.count(), 1);
        sched.run(true).unwrap();
        assert_eq!(sched.count(), 0);
        assert!(sched.is_empty());

        // Same thing via cancellation.
        let id2 = sched.oneshot(5u32, 0, |_| Ok(())).unwrap();
        assert_ne!(id, id2);
        sched.cancel(id2).unwrap();
        assert_eq!(sched.count(), 0);
    }

    #[test]
    fn test_fires_in_due_order_not_registration_order() {
        let (_clock, mut sched) = virtual_sched();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        sched
            .oneshot(5u32, 0, move |_| {
                o.borrow_mut().push(5);
                Ok(())
            })
            .unwrap();
        let o = order.clone();
        sched
            .oneshot(1u32, 0, move |_| {
                o.borrow_mut().push(1);
                Ok(())
            })
            .unwrap();

        sched.run(true).unwrap();
        assert_eq!(*order.borrow(), vec![1, 5]);
    }

    #[test]
    fn test_priority_then_fifo_at_equal_due() {
        let (_clock, mut sched) = virtual_sched();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (label, priority) in [("low", 5), ("first", 1), ("second", 1)] {
            let o = order.clone();
            sched
                .oneshot(10u32, priority, move |_| {
                    o.borrow_mut().push(label);
                    Ok(())
                })
                .unwrap();
        }

        sched.run(true).unwrap();
        assert_eq!(*order.borrow(), vec!["first", "second", "low"]);
    }

    #[test]
    fn test_cancelled_event_never_fires() {
        let (_clock, mut sched) = virtual_sched();
        let fired = Rc::new(Cell::new(false));

        let f = fired.clone();
        let doomed = sched
            .oneshot(1u32, 0, move |_| {
                f.set(true);
                Ok(())
            })
            .unwrap();
        sched.oneshot(2u32, 0, |_| Ok(())).unwrap();

        sched.cancel(doomed).unwrap();
        assert_eq!(sched.count(), 1);
        sched.run(true).unwrap();
        assert!(!fired.get());
    }

    #[test]
    fn test_cancel_unknown_id_is_not_found() {
        let (_clock, mut sched) = virtual_sched();
        let id = sched.oneshot(1u32, 0, |_| Ok(())).unwrap();
        sched.cancel(id).unwrap();

        let err = sched.cancel(id).unwrap_err();
        assert!(matches!(err, SchedulerError::NotFound { .. }));
        assert_eq!(sched.count(), 0);
    }

    #[test]
    fn test_repeat_period_measured_from_completion() {
        let (clock, mut sched) = virtual_sched();
        let fires = Rc::new(RefCell::new(Vec::new()));
        let me = Rc::new(Cell::new(None));

        let c = clock.clone();
        let f = fires.clone();
        let m = me.clone();
        let id = sched
            .repeat(10u32, 0, move |s| {
                f.borrow_mut().push(c.now());
                // Callback takes three seconds of virtual time.
                c.advance(Duration::seconds(3));
                if f.borrow().len() == 3 {
                    s.cancel(m.get().expect("own id"))?;
                }
                Ok(())
            })
            .unwrap();
        me.set(Some(id));

        sched.run(true).unwrap();

        // Gap between firings is period + callback runtime, not period.
        let expected = vec![
            start() + Duration::seconds(10),
            start() + Duration::seconds(23),
            start() + Duration::seconds(36),
        ];
        assert_eq!(*fires.borrow(), expected);
        assert_eq!(sched.count(), 0);
    }

    #[test]
    fn test_count_includes_running_callback() {
        let (_clock, mut sched) = virtual_sched();
        let seen = Rc::new(Cell::new(0));

        let s2 = seen.clone();
        sched
            .oneshot(1u32, 0, move |s| {
                s2.set(s.count());
                Ok(())
            })
            .unwrap();

        sched.run(true).unwrap();
        assert_eq!(seen.get(), 1);
        assert_eq!(sched.count(), 0);
    }

    #[test]
    fn test_nonblocking_dispatches_only_due_events() {
        let (clock, mut sched) = virtual_sched();
        let fired = Rc::new(RefCell::new(Vec::new()));

        for secs in [1u32, 5] {
            let f = fired.clone();
            sched
                .oneshot(secs, 0, move |_| {
                    f.borrow_mut().push(secs);
                    Ok(())
                })
                .unwrap();
        }

        clock.advance(Duration::seconds(1));
        sched.run(false).unwrap();
        assert_eq!(*fired.borrow(), vec![1]);
        assert_eq!(sched.count(), 1);

        // Still nothing due; returns without sleeping.
        sched.run(false).unwrap();
        assert_eq!(*fired.borrow(), vec![1]);

        clock.advance(Duration::seconds(4));
        sched.run(false).unwrap();
        assert_eq!(*fired.borrow(), vec![1, 5]);
    }

    #[test]
    fn test_callback_error_aborts_run() {
        let (_clock, mut sched) = virtual_sched();
        let fired = Rc::new(Cell::new(false));

        sched
            .oneshot(1u32, 0, |_| Err(anyhow::anyhow!("boom")))
            .unwrap();
        let f = fired.clone();
        sched
            .oneshot(2u32, 0, move |_| {
                f.set(true);
                Ok(())
            })
            .unwrap();

        let err = sched.run(true).unwrap_err();
        assert!(matches!(err, SchedulerError::Callback(_)));
        // Failing event removed, the other untouched.
        assert_eq!(sched.count(), 1);
        assert!(!fired.get());

        // The caller decides to resume.
        sched.run(true).unwrap();
        assert!(fired.get());
    }

    #[test]
    fn test_failing_repeat_is_not_rearmed() {
        let (_clock, mut sched) = virtual_sched();
        sched
            .repeat(5u32, 0, |_| Err(anyhow::anyhow!("boom")))
            .unwrap();

        assert!(sched.run(true).is_err());
        assert_eq!(sched.count(), 0);
        sched.run(true).unwrap();
    }

    #[test]
    fn test_reentrant_registration_fires_in_same_run() {
        let (_clock, mut sched) = virtual_sched();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        sched
            .oneshot(1u32, 0, move |s| {
                o.borrow_mut().push("parent");
                let o2 = o.clone();
                s.oneshot(1u32, 0, move |_| {
                    o2.borrow_mut().push("child");
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        sched.run(true).unwrap();
        assert_eq!(*order.borrow(), vec!["parent", "child"]);
    }

    #[test]
    fn test_reentrant_cancel_from_sibling_callback() {
        let (_clock, mut sched) = virtual_sched();
        let fired = Rc::new(Cell::new(false));
        let victim = Rc::new(Cell::new(None));

        let v = victim.clone();
        sched
            .oneshot(1u32, 0, move |s| {
                s.cancel(v.get().expect("victim id"))?;
                Ok(())
            })
            .unwrap();
        let f = fired.clone();
        let id = sched
            .oneshot(1u32, 1, move |_| {
                f.set(true);
                Ok(())
            })
            .unwrap();
        victim.set(Some(id));

        sched.run(true).unwrap();
        assert!(!fired.get());
        assert_eq!(sched.count(), 0);
    }

    #[test]
    fn test_oneshot_on_days_waits_for_allowed_weekday() {
        // Registered on a Tuesday, Monday-only: due the following Monday,
        // never the same Tuesday.
        let (_clock, mut sched) = virtual_sched();
        sched
            .oneshot_on_days([0u8], at(10, 30), 0, |_| Ok(()))
            .unwrap();

        let due = sched.next_due().unwrap();
        assert_eq!(due.weekday(), Weekday::Mon);
        assert_eq!(
            due,
            NaiveDate::from_ymd_opt(2026, 8, 10)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_repeat_on_days_skips_weekend() {
        // Thursday 11:00, workdays at 10:30: Friday, then Monday.
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2026, 8, 6)
                .unwrap()
                .and_hms_opt(11, 0, 0)
                .unwrap(),
        );
        let mut sched = Scheduler::with_clock(clock.clone());
        let fires = Rc::new(RefCell::new(Vec::new()));
        let me = Rc::new(Cell::new(None));

        let c = clock.clone();
        let f = fires.clone();
        let m = me.clone();
        let id = sched
            .repeat_on_days("MTWTFss", at(10, 30), 0, move |s| {
                f.borrow_mut().push(c.now());
                if f.borrow().len() == 2 {
                    s.cancel(m.get().expect("own id"))?;
                }
                Ok(())
            })
            .unwrap();
        me.set(Some(id));

        sched.run(true).unwrap();

        let expected: Vec<NaiveDateTime> = [7, 10]
            .iter()
            .map(|&d| {
                NaiveDate::from_ymd_opt(2026, 8, d)
                    .unwrap()
                    .and_hms_opt(10, 30, 0)
                    .unwrap()
            })
            .collect();
        assert_eq!(*fires.borrow(), expected);
    }

    #[test]
    fn test_daily_repeat_keeps_cadence_after_late_dispatch() {
        let (clock, mut sched) = virtual_sched();
        let id = sched.repeat(at(10, 30), 0, |_| Ok(())).unwrap();
        assert_eq!(sched.next_due(), Some(start().date().and_time(at(10, 30))));

        // Dispatch ninety minutes late; the next occurrence still counts
        // from the scheduled 10:30, not from the actual firing time.
        clock.set(start().date().and_time(at(12, 0)));
        sched.run(false).unwrap();
        assert_eq!(
            sched.next_due(),
            Some((start().date() + Duration::days(1)).and_time(at(10, 30)))
        );
        sched.cancel(id).unwrap();
    }

    #[test]
    fn test_past_datetime_fires_on_next_pass() {
        let (_clock, mut sched) = virtual_sched();
        let fired = Rc::new(Cell::new(false));

        let f = fired.clone();
        sched
            .oneshot(start() - Duration::hours(1), 0, move |_| {
                f.set(true);
                Ok(())
            })
            .unwrap();

        sched.run(false).unwrap();
        assert!(fired.get());
    }

    #[test]
    fn test_empty_day_mask_rejected_at_registration() {
        let (_clock, mut sched) = virtual_sched();
        let err = sched
            .repeat_on_days("mtwtfss", at(10, 30), 0, |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSpec(_)));
        assert_eq!(sched.count(), 0);
    }

    #[test]
    fn test_zero_period_rejected() {
        let (_clock, mut sched) = virtual_sched();
        assert!(sched.repeat(0u32, 0, |_| Ok(())).is_err());
        assert_eq!(sched.count(), 0);
    }
}
