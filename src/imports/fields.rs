//! Lenient parsing of individual CSV cells.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MalformedValue {
    #[error("Missing `{0}` column")]
    Missing(&'static str),

    #[error("Unable to parse number `{0}`")]
    Number(String),

    #[error("Unable to parse timestamp `{0}`")]
    Timestamp(String),
}

/// Timestamps without an offset are taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%F %T%.f",
    "%FT%T%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M%p",
];

/// Parse a decimal cell. Thousands separators are ignored and a blank cell is zero.
///
/// Cells that still fail to parse are retried with everything but digits, `.` and `-` removed,
/// which handles currency symbols and stray units.
pub fn parse_decimal(s: &str) -> Result<Decimal, MalformedValue> {
    let s = s.trim().replace(',', "");
    if s.is_empty() {
        return Ok(Decimal::ZERO);
    }
    if let Ok(value) = s.parse::<Decimal>() {
        return Ok(value);
    }
    if let Ok(value) = Decimal::from_scientific(&s) {
        return Ok(value);
    }

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned
        .parse()
        .map_err(|_| MalformedValue::Number(s.to_string()))
}

/// Parse a timestamp in any of the layouts exchanges commonly export.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, MalformedValue> {
    let s = s.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.with_timezone(&Utc));
    }
    if let Ok(time) = DateTime::parse_from_str(s, "%F %T%.f%:z") {
        return Ok(time.with_timezone(&Utc));
    }

    let naive = s.strip_suffix(" UTC").unwrap_or(s);
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(naive, "%F")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|time| time.and_utc())
        .ok_or_else(|| MalformedValue::Timestamp(s.to_string()))
}
