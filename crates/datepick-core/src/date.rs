use std::rc::Rc;

use chrono::{Datelike, Duration, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{Error, Result};

pub const DEFAULT_DISPLAY_FORMAT: &str = "%a %b %d %Y";
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn first_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Anchor used for `current_date`: the same month with the day forced to 1.
pub fn month_anchor(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))
}

/// `None` past either end of the representable calendar.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

/// Moves a month anchor by `months`, keeping the day at 1. A shift past
/// either end of the calendar returns the anchor unchanged.
pub fn shift_months(anchor: NaiveDate, months: i32) -> NaiveDate {
    let step = Months::new(months.unsigned_abs());
    let shifted = if months < 0 {
        anchor.checked_sub_months(step)
    } else {
        anchor.checked_add_months(step)
    };
    shifted.map_or(anchor, month_anchor)
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of blank columns before day 1 when weeks start on `start_day`
/// (0 = Sunday ... 6 = Saturday).
pub fn leading_offset(anchor: NaiveDate, start_day: u8) -> u32 {
    let first = anchor.weekday().num_days_from_sunday();
    (7 + first - u32::from(start_day)) % 7
}

pub fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT)
        .map_err(|_| Error::InvalidDate(raw.to_string()))
}

pub fn format_display(date: NaiveDate) -> String {
    date.format(DEFAULT_DISPLAY_FORMAT).to_string()
}

/// Source of "today" for the `dp-today` class.
#[derive(Clone)]
pub enum Clock {
    Zone(Tz),
    Fixed(NaiveDate),
    Custom(Rc<dyn Fn() -> NaiveDate>),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::Zone(tz) => Utc::now().with_timezone(tz).date_naive(),
            Clock::Fixed(date) => *date,
            Clock::Custom(f) => f(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::Zone(chrono_tz::UTC)
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Clock::Zone(tz) => f.debug_tuple("Zone").field(tz).finish(),
            Clock::Fixed(date) => f.debug_tuple("Fixed").field(date).finish(),
            Clock::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

pub fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(error) => {
            tracing::error!(
                source,
                timezone = %trimmed,
                error = %error,
                "invalid timezone id"
            );
            None
        }
    }
}
