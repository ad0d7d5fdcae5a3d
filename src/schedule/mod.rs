//! Weekday scheme and calendar-day helpers.
//!
//! Habits express their weekly schedule against a fixed 1-7 numbering where
//! 1 = Sunday and 7 = Saturday. All calendar-day comparisons for completion
//! records use the UTC date.

use chrono::{Datelike, NaiveDate, Utc};

/// Map a date to the scheme weekday number (1 = Sunday .. 7 = Saturday).
pub fn scheme_day(date: NaiveDate) -> i64 {
    ((date.weekday().num_days_from_monday() + 1) % 7 + 1) as i64
}

/// The current calendar day in UTC.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Format a date the way `completed_on` is stored.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_scheme_day_full_week() {
        // 2024-01-01 was a Monday
        assert_eq!(scheme_day(date(2024, 1, 1)), 2); // Monday
        assert_eq!(scheme_day(date(2024, 1, 2)), 3); // Tuesday
        assert_eq!(scheme_day(date(2024, 1, 3)), 4); // Wednesday
        assert_eq!(scheme_day(date(2024, 1, 4)), 5); // Thursday
        assert_eq!(scheme_day(date(2024, 1, 5)), 6); // Friday
        assert_eq!(scheme_day(date(2024, 1, 6)), 7); // Saturday
        assert_eq!(scheme_day(date(2024, 1, 7)), 1); // Sunday
    }

    #[test]
    fn test_scheme_day_stable_across_weeks() {
        assert_eq!(scheme_day(date(2024, 1, 7)), scheme_day(date(2024, 1, 14)));
        assert_eq!(scheme_day(date(2023, 12, 31)), 1); // also a Sunday
    }

    #[test]
    fn test_format_day() {
        assert_eq!(format_day(date(2024, 1, 7)), "2024-01-07");
        assert_eq!(format_day(date(2024, 11, 30)), "2024-11-30");
    }
}
