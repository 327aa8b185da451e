//! Date normalization for API parameters
//!
//! Every date sent to the API is a calendar day in New York, formatted as
//! `yyyy-MM-dd`, whatever the local zone of the device is.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::{America::New_York, Tz};

use crate::error::Error;

/// Zone all API dates are expressed in
pub const TIME_ZONE: Tz = New_York;

const DATE_FORMAT: &str = "%Y-%m-%d";
const LONG_FORMAT: &str = "%B %-d, %Y";

/// Calendar day of `instant` in New York, as `yyyy-MM-dd`
pub fn format_date_ymd<Z: TimeZone>(instant: &DateTime<Z>) -> String {
    instant.with_timezone(&TIME_ZONE).format(DATE_FORMAT).to_string()
}

/// Calendar day of `instant` in New York, as e.g. `March 5, 2024`
pub fn format_date_long<Z: TimeZone>(instant: &DateTime<Z>) -> String {
    instant.with_timezone(&TIME_ZONE).format(LONG_FORMAT).to_string()
}

pub fn parse_date_ymd(value: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| Error::malformed("date", value))
}

/// The current calendar day in New York
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&TIME_ZONE).date_naive()
}

pub fn today_ymd() -> String {
    today().format(DATE_FORMAT).to_string()
}

/// Inclusive date window used by the progress and weight-history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `days` back from today through tomorrow, so entries logged today
    /// are always inside the window
    pub fn last_days(days: i64) -> Self {
        Self::ending_after(today(), days)
    }

    /// `days` back from `day` through the day after it
    pub fn ending_after(day: NaiveDate, days: i64) -> Self {
        Self {
            start: day - Duration::days(days),
            end: day + Duration::days(1),
        }
    }

    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_utc_evening_is_previous_day_in_new_york() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 5, 2, 30, 0).unwrap();
        assert_eq!(format_date_ymd(&instant), "2024-03-04");

        let instant = Utc.with_ymd_and_hms(2024, 7, 1, 16, 0, 0).unwrap();
        assert_eq!(format_date_ymd(&instant), "2024-07-01");
        assert_eq!(format_date_long(&instant), "July 1, 2024");
    }

    #[test]
    fn test_range_params() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let range = DateRange::ending_after(day, 30);
        assert_eq!(range.start_param(), "2024-01-01");
        assert_eq!(range.end_param(), "2024-02-01");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date_ymd("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(matches!(
            parse_date_ymd("02/29/2024"),
            Err(Error::MalformedInput { field: "date", .. })
        ));
    }
}
