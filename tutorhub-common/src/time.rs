//! Timestamp and calendar utilities

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC calendar date
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sunday of the week containing `date`
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

/// Day-of-week index used by stored time slots (0 = Sunday … 6 = Saturday)
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_week_bounds() {
        // 2024-05-15 is a Wednesday
        let date = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert_eq!(week_start(date), NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        assert_eq!(week_end(date), NaiveDate::from_ymd_opt(2024, 5, 19).unwrap());
    }

    #[test]
    fn test_week_start_on_monday_and_sunday() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        assert_eq!(week_start(monday), monday);
        assert_eq!(week_start(sunday), monday);
    }

    #[test]
    fn test_weekday_index_sunday_is_zero() {
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 5, 18).unwrap();
        assert_eq!(weekday_index(sunday), 0);
        assert_eq!(weekday_index(saturday), 6);
    }
}
