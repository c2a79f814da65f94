use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use super::error::ConfigError;

/// A calendar month. Orders by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateMonth {
    year: i32,
    month: u32,
}

impl DateMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        // month is always 1..=12 and day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Millisecond Unix timestamps bounding the month: 00:00:00.000 UTC on the first day,
    /// through one millisecond before the next month starts.
    pub fn millis_bounds(self) -> (i64, i64) {
        let start = Self::midnight_millis(self.first_day());
        let next = Self::midnight_millis(self.succ().first_day());
        (start, next - 1)
    }

    fn midnight_millis(day: NaiveDate) -> i64 {
        day.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default()
    }
}

impl fmt::Display for DateMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for DateMonth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ConfigError::InvalidMonth(s.to_string());

        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

/// Inclusive span of months. Iterating never mutates the range, so it can be walked
/// any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    start: DateMonth,
    end: DateMonth,
}

impl MonthRange {
    /// An empty range results when `end` precedes `start`.
    pub fn new(start: DateMonth, end: DateMonth) -> Self {
        Self { start, end }
    }

    /// Every month touched by the calendar dates `[start, end]`.
    pub fn between_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(DateMonth::of(start), DateMonth::of(end))
    }

    pub fn iter(&self) -> Months {
        Months {
            next: Some(self.start).filter(|s| *s <= self.end),
            end: self.end,
        }
    }
}

impl IntoIterator for &MonthRange {
    type Item = DateMonth;
    type IntoIter = Months;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Months {
    next: Option<DateMonth>,
    end: DateMonth,
}

impl Iterator for Months {
    type Item = DateMonth;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = Some(current.succ()).filter(|n| *n <= self.end);
        Some(current)
    }
}
