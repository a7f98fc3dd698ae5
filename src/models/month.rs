//! Calendar months and the reporting window they cover.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

use super::ModelError;

/// Timestamp layout accepted by the analytics filters.
pub const WINDOW_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// A calendar month, named by the three-letter code used as a sheet column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// Column header for this month ("Jan", "Feb", ...).
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    /// 1-based month number.
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for Month {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Month::ALL
            .into_iter()
            .find(|m| m.abbreviation().eq_ignore_ascii_case(code))
            .ok_or_else(|| {
                ModelError::InvalidInput(format!(
                    "unrecognized month '{}' (expected one of Jan..Dec)",
                    s
                ))
            })
    }
}

/// The `[start, end]` bounds of one calendar month, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub month: Month,
    pub year: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub last_day: NaiveDate,
}

impl MonthWindow {
    /// Resolve the window for `month` in `year`.
    ///
    /// `end` is the last second of the last day of the month.
    pub fn resolve(month: Month, year: i32) -> Result<Self, ModelError> {
        let invalid_year = || ModelError::InvalidInput(format!("year {} is out of range", year));

        let first_day = NaiveDate::from_ymd_opt(year, month.number(), 1).ok_or_else(invalid_year)?;
        let next_first = if month == Month::Dec {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month.number() + 1, 1)
        };
        let last_day = next_first
            .and_then(|d| d.pred_opt())
            .ok_or_else(invalid_year)?;

        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).ok_or_else(invalid_year)?;

        Ok(Self {
            month,
            year,
            start: first_day.and_time(NaiveTime::MIN).and_utc(),
            end: last_day.and_time(end_of_day).and_utc(),
            last_day,
        })
    }

    /// Number of days in the month.
    pub fn days(&self) -> u32 {
        self.last_day.day()
    }

    /// Formatted lower bound for `created_at_start`.
    pub fn start_param(&self) -> String {
        self.start.format(WINDOW_TIMESTAMP_FORMAT).to_string()
    }

    /// Formatted upper bound for `created_at_end`.
    pub fn end_param(&self) -> String {
        self.end.format(WINDOW_TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_parse() {
        assert_eq!("Jan".parse::<Month>().unwrap(), Month::Jan);
        assert_eq!("sep".parse::<Month>().unwrap(), Month::Sep);
        assert_eq!(" DEC ".parse::<Month>().unwrap(), Month::Dec);
    }

    #[test]
    fn test_month_parse_unknown() {
        let err = "January".parse::<Month>().unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(_)));
        assert!("".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_number_and_display() {
        assert_eq!(Month::Jan.number(), 1);
        assert_eq!(Month::Dec.number(), 12);
        assert_eq!(Month::Jun.to_string(), "Jun");
    }

    #[test]
    fn test_leap_february() {
        let window = MonthWindow::resolve(Month::Feb, 2024).unwrap();

        assert_eq!(window.start_param(), "2024-02-01T00:00:00.000000Z");
        assert_eq!(window.days(), 29);
        assert_eq!(window.last_day, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(window.end_param(), "2024-02-29T23:59:59.000000Z");
    }

    #[test]
    fn test_common_february() {
        let window = MonthWindow::resolve(Month::Feb, 2025).unwrap();
        assert_eq!(window.days(), 28);
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let window = MonthWindow::resolve(Month::Dec, 2025).unwrap();

        assert_eq!(window.start_param(), "2025-12-01T00:00:00.000000Z");
        assert_eq!(window.end_param(), "2025-12-31T23:59:59.000000Z");
    }

    #[test]
    fn test_thirty_day_month() {
        let window = MonthWindow::resolve(Month::Apr, 2025).unwrap();
        assert_eq!(window.days(), 30);
        assert!(window.start < window.end);
    }

    #[test]
    fn test_out_of_range_year() {
        assert!(MonthWindow::resolve(Month::Jan, 1_000_000).is_err());
    }
}
