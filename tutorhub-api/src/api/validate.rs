//! Field checks shared by several handlers

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tutorhub_common::resources::keys;
use tutorhub_common::time;

use crate::error::{ApiError, ApiResult};

/// Trimmed value, 400 "<field> is required." when blank
pub fn required<'a>(value: &'a str, field: &str) -> ApiResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::required(field))
    } else {
        Ok(value)
    }
}

pub fn age_range(from: i64, end: i64) -> ApiResult<()> {
    if from < 0 || from > end {
        return Err(ApiError::bad_request(keys::INVALID_AGE_RANGE));
    }
    Ok(())
}

/// An open-ended range (no end date) is always valid
pub fn date_range(start: NaiveDate, end: Option<NaiveDate>) -> ApiResult<()> {
    match end {
        Some(end) if end < start => Err(ApiError::bad_request(keys::INVALID_DATE_RANGE)),
        _ => Ok(()),
    }
}

pub fn not_in_future(date: NaiveDate, field: &str) -> ApiResult<()> {
    if date > time::today() {
        return Err(ApiError::date_in_future(field));
    }
    Ok(())
}

pub fn not_in_past(date: NaiveDate, field: &str) -> ApiResult<()> {
    if date < time::today() {
        return Err(ApiError::date_in_past(field));
    }
    Ok(())
}

/// A session starting at `start` on `date` must not have started by `now`
pub fn not_started(date: NaiveDate, start: NaiveTime, now: NaiveDateTime, field: &str) -> ApiResult<()> {
    if date.and_time(start) < now {
        return Err(ApiError::date_in_past(field));
    }
    Ok(())
}
