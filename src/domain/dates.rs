//! Date handling for the four ticket date pairs.
//!
//! Write-side input arrives as a date string plus an optional separate
//! `HH:MM` time of day. The stored value is a single timestamp; a supplied
//! time replaces the midnight placeholder. The read side splits the
//! timestamp back into its two display strings.

use crate::error::{Result, TasklineError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

fn parse_date(input: &str) -> Result<NaiveDate> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return Ok(date);
        }
    }
    Err(TasklineError::InvalidDate(input.to_string()))
}

fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|_| TasklineError::InvalidDate(input.to_string()))
}

/// Combines a date string and an optional time-of-day string into a stored
/// timestamp. An empty date yields `None`; a malformed date or time is a
/// fatal input error.
pub fn normalize(date: &str, time: &str) -> Result<Option<NaiveDateTime>> {
    let date = date.trim();
    if date.is_empty() {
        return Ok(None);
    }

    let day = parse_date(date)?;
    let time = time.trim();
    let time_of_day = if time.is_empty() {
        NaiveTime::MIN
    } else {
        parse_time(time)?
    };

    Ok(Some(day.and_time(time_of_day)))
}

/// Display date portion of a stored timestamp, empty when unset.
pub fn display_date(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Time-of-day portion of a stored timestamp, empty when unset.
pub fn extract_time(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}
