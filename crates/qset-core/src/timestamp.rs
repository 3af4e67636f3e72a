//! Timestamp parsing and formatting for query bounds and range metadata.
//!
//! Accepted inputs:
//! - `2020-06-01`
//! - `2020-06-01 09:30`, `2020-06-01T09:30:00`, `2020-06-01 09:30:00.250`
//! - RFC 3339 with an offset (`2020-06-01T09:30:00+02:00`, `...Z`), converted to UTC

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::{QsetError, Result};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp in any of the accepted forms.
pub fn parse_timestamp(input: &str) -> Result<NaiveDateTime> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(QsetError::InvalidQuery(format!("unrecognised timestamp {input:?}")))
}

/// Render a timestamp the way request parameters carry it.
pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Serde adapter: timestamps as strings in any accepted form.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).map_err(serde::de::Error::custom)
}

pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&format_timestamp(dt))
}
