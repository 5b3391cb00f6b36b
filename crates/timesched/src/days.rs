//! Day-of-week filtering — weekday sets, the `"MTWTFSS"` mask format, and
//! the next-occurrence walk used to pin events to allowed days.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SchedulerError};

/// Day-of-week mask template, Monday first. Character case encodes
/// membership when parsing: upper = included, lower = excluded.
pub const DAYS_STRING: &str = "MTWTFSS";

/// A set of weekdays, Monday-first.
///
/// Defaults to all seven days. Build one from a mask string
/// (`parse_days("MTWTFss")`), from weekday integers 0–6
/// (`DaySet::try_from([0, 2])`), or from [`chrono::Weekday`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySet(u8);

impl DaySet {
    /// Every day of the week.
    pub const ALL: DaySet = DaySet(0b0111_1111);

    /// Whether `day` is in the set.
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of days in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }
}

impl Default for DaySet {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for DaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in DAYS_STRING.chars().enumerate() {
            let c = if self.0 & (1 << i) != 0 {
                c
            } else {
                c.to_ascii_lowercase()
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl From<Weekday> for DaySet {
    fn from(day: Weekday) -> Self {
        let mut set = DaySet(0);
        set.insert(day);
        set
    }
}

impl FromIterator<Weekday> for DaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = DaySet(0);
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl TryFrom<&[u8]> for DaySet {
    type Error = SchedulerError;

    /// Weekday integers, 0 = Monday .. 6 = Sunday.
    fn try_from(days: &[u8]) -> Result<Self> {
        let mut set = DaySet(0);
        for &n in days {
            let day = Weekday::try_from(n).map_err(|_| {
                SchedulerError::InvalidSpec(format!("weekday must be 0-6, got {n}"))
            })?;
            set.insert(day);
        }
        Ok(set)
    }
}

impl<const N: usize> TryFrom<[u8; N]> for DaySet {
    type Error = SchedulerError;

    fn try_from(days: [u8; N]) -> Result<Self> {
        DaySet::try_from(days.as_slice())
    }
}

impl TryFrom<&str> for DaySet {
    type Error = SchedulerError;

    fn try_from(mask: &str) -> Result<Self> {
        parse_days(mask)
    }
}

impl FromStr for DaySet {
    type Err = SchedulerError;

    fn from_str(mask: &str) -> Result<Self> {
        parse_days(mask)
    }
}

impl Serialize for DaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mask = String::deserialize(deserializer)?;
        parse_days(&mask).map_err(serde::de::Error::custom)
    }
}

/// Convert a `"MTWTFSS"`-style mask string into a [`DaySet`].
///
/// The string must be the seven Monday-first day letters in order; only the
/// case varies. `parse_days("MTWTFss")` selects the work week.
pub fn parse_days(mask: &str) -> Result<DaySet> {
    if !mask.eq_ignore_ascii_case(DAYS_STRING) {
        return Err(SchedulerError::InvalidSpec(format!(
            "day mask must be {DAYS_STRING} with case selecting days, got {mask:?}"
        )));
    }
    let mut set = DaySet(0);
    for (i, c) in mask.chars().enumerate() {
        if c.is_ascii_uppercase() {
            set.0 |= 1 << i;
        }
    }
    Ok(set)
}

/// First instant at `time` strictly after `after` whose weekday is in `days`.
///
/// Walks forward one calendar day at a time, starting from `after`'s own
/// day, so the result is at most a week out. An empty day set can never
/// qualify and is rejected.
pub fn next_occurrence(
    time: NaiveTime,
    days: DaySet,
    after: NaiveDateTime,
) -> Result<NaiveDateTime> {
    if days.is_empty() {
        return Err(SchedulerError::InvalidSpec(
            "day set must include at least one day".into(),
        ));
    }
    let mut candidate = after.date().and_time(time);
    while candidate <= after || !days.contains(candidate.weekday()) {
        candidate += Duration::days(1);
    }
    Ok(candidate)
}
