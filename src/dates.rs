//! ISO date handling: `YYYY-MM-DD` dates, `YYYY-MM` month keys, and the
//! trailing windows behind the trend series.
//!
//! `chrono::NaiveDate` already round-trips the boundary form (`Display` and
//! `FromStr` are exactly `YYYY-MM-DD`), so records carry typed dates and the
//! stores read/write the plain strings.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, LedgerResult};

/// Parses a strict `YYYY-MM-DD` date. Anything else, including unpadded
/// variants, fails validation.
pub fn parse_date(text: &str) -> LedgerResult<NaiveDate> {
    if text.len() != 10 {
        return Err(malformed_date(text));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| malformed_date(text))
}

fn malformed_date(text: &str) -> LedgerError {
    LedgerError::validation(format!("malformed date {text:?}, expected YYYY-MM-DD"))
}

/// A calendar month, the `YYYY-MM` prefix of an ISO date.
///
/// Internally pinned to the first day of the month so month arithmetic rides
/// on `chrono`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> LedgerResult<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(MonthKey)
            .ok_or_else(|| LedgerError::validation(format!("invalid month {year:04}-{month:02}")))
    }

    /// The month a date falls in.
    pub fn of(date: NaiveDate) -> Self {
        MonthKey(date.with_day(1).unwrap_or(date))
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.0.year() && date.month() == self.0.month()
    }

    /// First day of the month.
    pub fn start(self) -> NaiveDate {
        self.0
    }

    /// Last day of the month.
    pub fn end(self) -> NaiveDate {
        self.0
            .checked_add_months(Months::new(1))
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .unwrap_or(self.0)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), self.0.month())
    }
}

impl FromStr for MonthKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed =
            || LedgerError::validation(format!("malformed month key {s:?}, expected YYYY-MM"));
        let (year, month) = s.split_once('-').ok_or_else(malformed)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(malformed());
        }
        let year: i32 = year.parse().map_err(|_| malformed())?;
        let month: u32 = month.parse().map_err(|_| malformed())?;
        MonthKey::new(year, month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Trailing windows
// ---------------------------------------------------------------------------

/// The `count` days ending at `end`, oldest first. The dashboard chart uses
/// a 7-day window.
pub fn trailing_days(end: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..count)
        .rev()
        .filter_map(|back| end.checked_sub_days(Days::new(u64::from(back))))
        .collect()
}

/// The `count` months ending at `end`, oldest first. Reports use a 6-month
/// window.
pub fn trailing_months(end: MonthKey, count: u32) -> Vec<MonthKey> {
    (0..count)
        .rev()
        .filter_map(|back| end.0.checked_sub_months(Months::new(back)))
        .map(MonthKey)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
