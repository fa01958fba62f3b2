//! Calendar-day extraction from the timestamp formats found in tracker
//! exports.
//!
//! Every helper returns a naive [`NaiveDate`]: no time of day and no zone.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{HealthError, Result};

/// `04/01/24`: month/day/2-digit year.
pub const SHORT_US_DATE: &str = "%m/%d/%y";

/// `04/01/24 13:05:00`: month/day/2-digit year with minute precision.
pub const SHORT_US_DATETIME: &str = "%m/%d/%y %H:%M:%S";

/// Offset-carrying layouts tried after RFC 3339, including the ISO-8601 basic
/// offset form (`-0500`).
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Stateless collection of day parsers, one per timestamp convention.
pub struct DayParser;

impl DayParser {
    /// Parse `value` with an exact `chrono` date format.
    pub fn with_date_format(value: &str, format: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), format)
            .map_err(|_| HealthError::DateParse(value.to_string()))
    }

    /// Parse `value` with an exact `chrono` date-time format and truncate it
    /// to the calendar day.
    pub fn with_datetime_format(value: &str, format: &str) -> Result<NaiveDate> {
        NaiveDateTime::parse_from_str(value.trim(), format)
            .map(|dt| dt.date())
            .map_err(|_| HealthError::DateParse(value.to_string()))
    }

    /// `MM/DD/YY`.
    pub fn short_us_date(value: &str) -> Result<NaiveDate> {
        Self::with_date_format(value, SHORT_US_DATE)
    }

    /// `MM/DD/YY HH:MM:SS`, truncated to the day.
    pub fn short_us_datetime(value: &str) -> Result<NaiveDate> {
        Self::with_datetime_format(value, SHORT_US_DATETIME)
    }

    /// `YYYY-MM-DD`.
    pub fn iso_date(value: &str) -> Result<NaiveDate> {
        Self::with_date_format(value, "%Y-%m-%d")
    }

    /// ISO-8601 timestamp converted to UTC, then truncated to the UTC day.
    ///
    /// Timestamps without an offset are already taken to be UTC.
    pub fn utc_day(value: &str) -> Result<NaiveDate> {
        let trimmed = value.trim();
        if let Some(dt) = parse_with_offset(trimmed) {
            return Ok(dt.naive_utc().date());
        }
        parse_naive(trimmed).ok_or_else(|| HealthError::DateParse(value.to_string()))
    }

    /// ISO-8601 timestamp truncated to its local wall-clock day.
    ///
    /// Any offset is dropped without converting, so `2024-04-01T23:30:00-05:00`
    /// stays on 2024-04-01.
    pub fn local_day(value: &str) -> Result<NaiveDate> {
        let trimmed = value.trim();
        if let Some(dt) = parse_with_offset(trimmed) {
            return Ok(dt.naive_local().date());
        }
        parse_naive(trimmed).ok_or_else(|| HealthError::DateParse(value.to_string()))
    }
}

fn parse_with_offset(value: &str) -> Option<DateTime<chrono::FixedOffset>> {
    // Replace trailing 'Z' with '+00:00' for RFC 3339 compatibility.
    let normalised = match value.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => value.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt);
    }
    OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&normalised, fmt).ok())
}

fn parse_naive(value: &str) -> Option<NaiveDate> {
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
