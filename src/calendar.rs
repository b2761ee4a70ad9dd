//! Month segmentation
//!
//! Splits an inclusive date range into the calendar months it overlaps and
//! lists the weekday (Monday-Friday) columns of each month. No holiday
//! calendar is modeled.

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::debug;

use crate::error::ReportError;
use crate::types::{CalendarMonth, ReportScope};

/// Month segmenter for report date ranges
pub struct MonthSegmenter;

impl MonthSegmenter {
    /// Ordered, de-duplicated months whose span intersects the inclusive range
    pub fn segment(scope: &ReportScope) -> Result<Vec<CalendarMonth>, ReportError> {
        scope.validate()?;

        let last = CalendarMonth::of(scope.end);
        let mut months = Vec::new();
        let mut current = CalendarMonth::of(scope.start);

        while current <= last {
            months.push(current);
            current = next_month(current);
        }

        debug!(months = months.len(), %scope, "segmented report range");
        Ok(months)
    }

    /// Ascending day-of-month numbers of the Monday-Friday dates in a month
    pub fn weekdays(month: CalendarMonth) -> Vec<u32> {
        (1..=days_in_month(month))
            .filter(|&day| {
                NaiveDate::from_ymd_opt(month.year, month.month, day)
                    .map(is_weekday)
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Whether a date falls on Monday through Friday
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Three-letter abbreviation used in sheet headers
pub fn weekday_abbreviation(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Number of days in a month (28-31, leap-year aware)
pub fn days_in_month(month: CalendarMonth) -> u32 {
    let first = NaiveDate::from_ymd_opt(month.year, month.month, 1);
    let next = next_month(month);
    let next_first = NaiveDate::from_ymd_opt(next.year, next.month, 1);

    match (first, next_first) {
        (Some(first), Some(next_first)) => (next_first - first).num_days() as u32,
        _ => 0,
    }
}

fn next_month(month: CalendarMonth) -> CalendarMonth {
    if month.month >= 12 {
        CalendarMonth::new(month.year + 1, 1)
    } else {
        CalendarMonth::new(month.year, month.month + 1)
    }
}
