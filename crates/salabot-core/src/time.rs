//! Booking dates and time slots.
//!
//! This module provides the two canonical time types of the reservation
//! engine:
//! - [`BookingDate`]: a calendar date, rendered as `DD/MM/YYYY`
//! - [`TimeSlot`]: a same-day `HH:MM-HH:MM` range with half-open overlap
//!
//! Both types normalize free-form user input: dates accept the digits with
//! or without `/` separators, time slots accept bare hours (`"8-17"` means
//! `08:00-17:00`). Parsing is pure; the current day is always injected by
//! the caller.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/?(\d{2})/?(\d{4})$").expect("Invalid date regex"));

static CLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("Invalid clock regex"));

/// Errors produced while normalizing date or time-slot input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    /// The input does not look like a date at all.
    #[error("date must be DD/MM/YYYY or DDMMYYYY: {input:?}")]
    DateFormat { input: String },

    /// Day, month, or year is outside the accepted range.
    #[error("date out of range (day 1-31, month 1-12, year 2024-2099): {input:?}")]
    DateOutOfRange { input: String },

    /// The components are in range but do not form a real calendar date.
    #[error("no such calendar date: {input:?}")]
    DateNotInCalendar { input: String },

    /// The date lies before the current day.
    #[error("date is in the past: {input:?}")]
    DateInPast { input: String },

    /// The input is not a `start-end` pair of times of day.
    #[error("time range must be HH:MM-HH:MM (or bare hours like 08-17): {input:?}")]
    SlotFormat { input: String },

    /// Start and end parsed but the end is not strictly later.
    #[error("time range end must be after start: {input:?}")]
    SlotOrder { input: String },
}

/// A reservation's calendar date, canonical form `DD/MM/YYYY`.
///
/// Only dates from the current day onward (at parse time) are accepted;
/// the accepted year window is 2024-2099.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookingDate(NaiveDate);

impl BookingDate {
    /// Wraps an already-validated date. Intended for tests and internal
    /// construction; user input goes through [`BookingDate::parse`].
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Normalizes free-form date input.
    ///
    /// Accepts `DD/MM/YYYY`, `DDMMYYYY`, and mixed forms with either
    /// separator present. Whitespace is stripped. Rejects component
    /// ranges outside day 1-31 / month 1-12 / year 2024-2099,
    /// calendrically impossible combinations (Feb 31), and any date
    /// before `today`.
    pub fn parse(input: &str, today: NaiveDate) -> Result<Self, TimeParseError> {
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let caps = DATE_REGEX
            .captures(&cleaned)
            .ok_or_else(|| TimeParseError::DateFormat {
                input: input.to_string(),
            })?;

        let day: u32 = caps[1].parse().expect("two digits");
        let month: u32 = caps[2].parse().expect("two digits");
        let year: i32 = caps[3].parse().expect("four digits");

        if !(1..=31).contains(&day) || !(1..=12).contains(&month) || !(2024..=2099).contains(&year)
        {
            return Err(TimeParseError::DateOutOfRange {
                input: input.to_string(),
            });
        }

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            TimeParseError::DateNotInCalendar {
                input: input.to_string(),
            }
        })?;

        if date < today {
            return Err(TimeParseError::DateInPast {
                input: input.to_string(),
            });
        }

        Ok(Self(date))
    }

    /// Returns the underlying calendar date.
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Returns the month component (1-12).
    pub fn month(&self) -> u32 {
        use chrono::Datelike;
        self.0.month()
    }

    /// Returns the year component.
    pub fn year(&self) -> i32 {
        use chrono::Datelike;
        self.0.year()
    }
}

impl fmt::Display for BookingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%d/%m/%Y"))
    }
}

impl Serialize for BookingDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BookingDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let date = NaiveDate::parse_from_str(&s, "%d/%m/%Y").map_err(serde::de::Error::custom)?;
        Ok(Self(date))
    }
}

/// A same-day time range, canonical form `HH:MM-HH:MM`.
///
/// The range is half-open: a slot ending at 11:00 does not overlap a slot
/// starting at 11:00. Ranges never wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    /// Start of the slot (inclusive).
    pub start: NaiveTime,
    /// End of the slot (exclusive).
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Creates a slot from already-validated times.
    ///
    /// # Panics
    ///
    /// Panics if `end` is not strictly after `start`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        assert!(end > start, "TimeSlot end must be after start");
        Self { start, end }
    }

    /// Normalizes free-form time-range input.
    ///
    /// The input is split on a single `-` into start and end. A side
    /// without a colon is read as a whole hour (`"9"` becomes `"09:00"`).
    /// Both sides must then match `HH:MM` and name real times of day, and
    /// the end must be strictly later than the start.
    pub fn parse(input: &str) -> Result<Self, TimeParseError> {
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let format_err = || TimeParseError::SlotFormat {
            input: input.to_string(),
        };

        let mut sides = cleaned.split('-');
        let (raw_start, raw_end) = match (sides.next(), sides.next(), sides.next()) {
            (Some(s), Some(e), None) if !s.is_empty() && !e.is_empty() => (s, e),
            _ => return Err(format_err()),
        };

        let start = parse_clock(raw_start).ok_or_else(format_err)?;
        let end = parse_clock(raw_end).ok_or_else(format_err)?;

        if end <= start {
            return Err(TimeParseError::SlotOrder {
                input: input.to_string(),
            });
        }

        Ok(Self { start, end })
    }

    /// Minutes since midnight of the slot start.
    pub fn start_minutes(&self) -> u32 {
        use chrono::Timelike;
        self.start.hour() * 60 + self.start.minute()
    }

    /// Minutes since midnight of the slot end.
    pub fn end_minutes(&self) -> u32 {
        use chrono::Timelike;
        self.end.hour() * 60 + self.end.minute()
    }

    /// Half-open overlap check: `[start, end)` intervals touch without
    /// conflicting.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Duration of the slot in minutes.
    pub fn duration_minutes(&self) -> u32 {
        self.end_minutes() - self.start_minutes()
    }
}

/// Parses one side of a slot, padding bare hours to `HH:00`.
fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let padded = if raw.contains(':') {
        raw.to_string()
    } else {
        format!("{:0>2}:00", raw)
    };
    if !CLOCK_REGEX.is_match(&padded) {
        return None;
    }
    NaiveTime::parse_from_str(&padded, "%H:%M").ok()
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

impl FromStr for TimeSlot {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Joins a date and a slot into the meeting's start instant.
///
/// The engine runs in a single fixed organizational timezone, so naive
/// local datetimes are sufficient everywhere.
pub fn meeting_start(date: BookingDate, slot: TimeSlot) -> NaiveDateTime {
    date.as_naive().and_time(slot.start)
}
