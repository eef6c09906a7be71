use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{EngineError, Result};

/// number of days in a month of the proleptic gregorian calendar, 0 for a month outside 1..=12
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// calendar date from parts, `None` when the parts do not name a real day
pub fn make_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `YYYY-MM-DD`
pub fn to_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// parse a strict `YYYY-MM-DD` date, `None` on anything else
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    let year = s[0..4].parse().ok()?;
    let month = s[5..7].parse().ok()?;
    let day = s[8..10].parse().ok()?;
    make_date(year, month, day)
}

/// a calendar month, ordered chronologically and formatted as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidDate {
                message: format!("month {} out of range", month),
            });
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }

    /// shift by whole months, wrapping year boundaries
    pub fn add_months(&self, delta: i32) -> Self {
        Self::from_index(self.index() + delta as i64)
    }

    pub fn next(&self) -> Self {
        self.add_months(1)
    }

    pub fn prev(&self) -> Self {
        self.add_months(-1)
    }

    /// signed number of months from `self` to `other`
    pub fn months_until(&self, other: MonthKey) -> i64 {
        other.index() - self.index()
    }

    pub fn days(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        make_date(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        make_date(self.year, self.month, self.days())
    }

    /// the date a day-of-month rule lands on in this month, clamped to the month's length
    pub fn date_for(&self, day: DayOfMonth) -> Option<NaiveDate> {
        make_date(self.year, self.month, day.resolve(self.year, self.month))
    }

    /// true when `date` falls inside this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EngineError::InvalidDate {
            message: format!("malformed month key '{}'", s),
        };
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// day-of-month rule for payments and statement closings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DayOfMonthRepr", into = "DayOfMonthRepr")]
pub enum DayOfMonth {
    /// a fixed day 1..=31, clamped in shorter months
    Day(u8),
    /// the last day of each month
    EndOfMonth,
}

impl DayOfMonth {
    pub fn day(day: u32) -> Result<Self> {
        if !(1..=31).contains(&day) {
            return Err(EngineError::InvalidDayOfMonth { day });
        }
        Ok(DayOfMonth::Day(day as u8))
    }

    /// concrete day number in the given month
    pub fn resolve(&self, year: i32, month: u32) -> u32 {
        let last = days_in_month(year, month);
        match self {
            DayOfMonth::Day(d) => (*d as u32).min(last),
            DayOfMonth::EndOfMonth => last,
        }
    }
}

impl fmt::Display for DayOfMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayOfMonth::Day(d) => write!(f, "{}", d),
            DayOfMonth::EndOfMonth => write!(f, "EOM"),
        }
    }
}

impl FromStr for DayOfMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("eom") {
            return Ok(DayOfMonth::EndOfMonth);
        }
        let day = s.parse().map_err(|_| EngineError::InvalidConfiguration {
            message: format!("malformed day of month '{}'", s),
        })?;
        DayOfMonth::day(day)
    }
}

/// wire form: a bare number or the string "EOM"
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DayOfMonthRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<DayOfMonthRepr> for DayOfMonth {
    type Error = EngineError;

    fn try_from(repr: DayOfMonthRepr) -> Result<Self> {
        match repr {
            DayOfMonthRepr::Number(d) => DayOfMonth::day(d),
            DayOfMonthRepr::Text(s) => s.parse(),
        }
    }
}

impl From<DayOfMonth> for DayOfMonthRepr {
    fn from(day: DayOfMonth) -> Self {
        match day {
            DayOfMonth::Day(d) => DayOfMonthRepr::Number(d as u32),
            DayOfMonth::EndOfMonth => DayOfMonthRepr::Text("EOM".to_string()),
        }
    }
}
