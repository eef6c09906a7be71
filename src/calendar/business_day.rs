use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// longest run of non-business days an adjustment will walk across
const MAX_ADJUST_DAYS: u32 = 31;

/// source of truth for which days are business days
pub trait BusinessCalendar {
    fn is_business_day(&self, date: NaiveDate) -> bool;
}

/// saturdays and sundays are the only non-business days
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekendsOnly;

impl BusinessCalendar for WeekendsOnly {
    fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

/// how a date that falls on a non-business day is moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekendPolicy {
    /// move back to the nearest earlier business day
    #[default]
    PrevBusiness,
    /// move forward to the nearest later business day
    NextBusiness,
    /// keep the date as is
    #[serde(rename = "none")]
    Unadjusted,
}

impl WeekendPolicy {
    /// apply the policy against a business calendar
    pub fn adjust<C: BusinessCalendar + ?Sized>(&self, date: NaiveDate, calendar: &C) -> NaiveDate {
        let step: fn(&NaiveDate) -> Option<NaiveDate> = match self {
            WeekendPolicy::PrevBusiness => NaiveDate::pred_opt,
            WeekendPolicy::NextBusiness => NaiveDate::succ_opt,
            WeekendPolicy::Unadjusted => return date,
        };

        let mut candidate = date;
        for _ in 0..MAX_ADJUST_DAYS {
            if calendar.is_business_day(candidate) {
                return candidate;
            }
            match step(&candidate) {
                Some(next) => candidate = next,
                None => break,
            }
        }

        // a calendar with no business day in reach leaves the date alone
        date
    }
}
