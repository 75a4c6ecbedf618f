//! Calendar arithmetic for walking a date range one day at a time.
//!
//! Uses the simplified leap-year rule `year % 4 == 0`, so 1900-02-29 is a
//! valid day here even though the Gregorian calendar skips it.

use crate::error::{ExtractError, Result};
use std::fmt;
use std::str::FromStr;

const DAYS_PER_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// A calendar day parsed from `YYYY-MM-DD`
///
/// Field order gives the derived `Ord` the (year, month, day) lexicographic
/// ordering used by [`in_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: i32,
    month: u32,
    day: u32,
}

impl Date {
    /// Build a date, rejecting months or days outside the calendar
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ExtractError::configuration(format!(
                "month {} out of range in date {:04}-{:02}-{:02}",
                month, year, month, day
            )));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(ExtractError::configuration(format!(
                "day {} out of range in date {:04}-{:02}-{:02}",
                day, year, month, day
            )));
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

/// Leap years are every fourth year, without the century exceptions
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0
}

/// Number of days in `month` (1-based) of `year`
pub fn days_in_month(year: i32, month: u32) -> u32 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS_PER_MONTH[(month - 1) as usize]
    }
}

/// The day after `date`, rolling over month and year ends
pub fn next_day(date: Date) -> Date {
    let Date {
        mut year,
        mut month,
        mut day,
    } = date;

    day += 1;
    if day > days_in_month(year, month) {
        day = 1;
        month += 1;
    }
    if month > 12 {
        month = 1;
        year += 1;
    }

    Date { year, month, day }
}

/// True while `current` is on or before `last`
pub fn in_range(current: Date, last: Date) -> bool {
    current <= last
}

impl FromStr for Date {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            ExtractError::configuration(format!("invalid date '{}', expected YYYY-MM-DD", s))
        };

        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(invalid());
        }
        let digits = |range: std::ops::Range<usize>| -> Result<u32> {
            let part = &s[range];
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u32>().map_err(|_| invalid())
        };

        let year = digits(0..4)? as i32;
        let month = digits(5..7)?;
        let day = digits(8..10)?;

        Date::new(year, month, day)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}
