//! Ordered pending-event store.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use crate::event::{Event, EventId};

/// Strict total order over pending events: due time, then priority (lower
/// first), then insertion order. No two events compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    due: NaiveDateTime,
    priority: i32,
    seq: u64,
}

impl EventKey {
    fn of(event: &Event) -> Self {
        Self {
            due: event.due,
            priority: event.priority,
            seq: event.seq,
        }
    }
}

/// Pending events ordered by [`EventKey`], with an id index for
/// removal-by-handle. Everything is O(log n).
#[derive(Default)]
pub(crate) struct EventStore {
    queue: BTreeMap<EventKey, Event>,
    index: HashMap<EventId, EventKey>,
}

impl EventStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, event: Event) {
        let key = EventKey::of(&event);
        let previous = self.index.insert(event.id, key);
        debug_assert!(previous.is_none(), "duplicate event id in store");
        self.queue.insert(key, event);
    }

    /// Due time of the earliest pending event.
    pub(crate) fn next_due(&self) -> Option<NaiveDateTime> {
        self.queue.keys().next().map(|key| key.due)
    }

    /// Remove and return the earliest event if it is due at `now`.
    pub(crate) fn pop_if_due(&mut self, now: NaiveDateTime) -> Option<Event> {
        if self.next_due()? > now {
            return None;
        }
        let (_, event) = self.queue.pop_first()?;
        self.index.remove(&event.id);
        Some(event)
    }

    pub(crate) fn remove(&mut self, id: EventId) -> Option<Event> {
        let key = self.index.remove(&id)?;
        self.queue.remove(&key)
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
