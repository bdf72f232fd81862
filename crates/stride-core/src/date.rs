//! Timezone-independent calendar days.
//!
//! Every streak comparison works on [`CalendarDate`], never on timestamps
//! with a time of day. Timestamps are converted to UTC before truncation so
//! that the caller's local zone cannot shift an event onto a neighbouring day.
//!
//! # Accepted inputs
//!
//! | Form | Example | Handling |
//! |------|---------|----------|
//! | plain date | `2024-01-05` | taken as-is |
//! | RFC 3339 | `2024-01-05T23:30:00-02:00` | converted to UTC, then truncated |
//! | naive timestamp | `2024-01-05T08:00:00`, `2024-01-05 08:00:00.123` | interpreted as UTC |

#![allow(clippy::module_name_repetitions)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::EngineError;

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A year/month/day triple with no time-of-day or zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// Build a date from its parts; `None` for impossible dates.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// The UTC calendar day of a zoned timestamp.
    pub fn from_utc<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> Self {
        Self(timestamp.with_timezone(&Utc).date_naive())
    }

    /// The UTC calendar day of a Unix timestamp in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidDate`] when the timestamp is outside
    /// the representable range.
    pub fn from_unix_seconds(secs: i64) -> Result<Self, EngineError> {
        DateTime::from_timestamp(secs, 0)
            .map(|ts| Self(ts.date_naive()))
            .ok_or_else(|| EngineError::InvalidDate {
                input: secs.to_string(),
            })
    }

    #[must_use]
    pub const fn naive(self) -> NaiveDate {
        self.0
    }

    /// The previous day, or `None` at the start of the representable range.
    #[must_use]
    pub fn pred(self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    /// The next day, or `None` at the end of the representable range.
    #[must_use]
    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for CalendarDate {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

/// Normalize a timestamp-like string to its UTC calendar day.
///
/// # Errors
///
/// Returns [`EngineError::InvalidDate`] when the input matches none of the
/// accepted forms or names an impossible date.
pub fn normalize(timestamp: &str) -> Result<CalendarDate, EngineError> {
    let raw = timestamp.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(CalendarDate(date));
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(CalendarDate::from_utc(&ts));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|ts| CalendarDate(ts.date()))
        .ok_or_else(|| EngineError::InvalidDate {
            input: timestamp.to_string(),
        })
}

/// Signed day count `b - a`.
#[must_use]
pub fn days_between(a: CalendarDate, b: CalendarDate) -> i64 {
    b.0.signed_duration_since(a.0).num_days()
}

/// `true` iff `later` is exactly the day after `earlier`.
#[must_use]
pub fn is_consecutive(earlier: CalendarDate, later: CalendarDate) -> bool {
    days_between(earlier, later) == 1
}

/// Source of "today", injectable for deterministic tests.
pub trait Clock {
    fn today(&self) -> CalendarDate;
}

/// The real UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> CalendarDate {
        CalendarDate(Utc::now().date_naive())
    }
}

/// A clock pinned to one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub CalendarDate);

impl Clock for FixedClock {
    fn today(&self) -> CalendarDate {
        self.0
    }
}
