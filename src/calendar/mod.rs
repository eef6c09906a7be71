pub mod business_day;
pub mod month;

pub use business_day::{BusinessCalendar, WeekendPolicy, WeekendsOnly};
pub use month::{days_in_month, is_leap_year, make_date, parse_date, to_key, DayOfMonth, MonthKey};
