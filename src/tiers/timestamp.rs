use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimestampError {
    #[error("empty timestamp")]
    Empty,
    #[error("unrecognised timestamp {0:?}")]
    Invalid(String),
}

/// Parses a last-charge value: either `YYYY-MM-DD` or an ISO-8601 date-time.
///
/// Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TimestampError::Empty);
    }

    if value.contains('T') {
        let normalized = match value.strip_suffix('Z') {
            Some(rest) => format!("{rest}+00:00"),
            None => value.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return Ok(dt);
        }
        return NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc().fixed_offset())
            .map_err(|_| TimestampError::Invalid(value.to_string()));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| TimestampError::Invalid(value.to_string()))
}

/// Reduces a timestamp to `YYYY-MM-DD`; unparseable values are returned unchanged.
pub fn normalize_date(value: &str) -> String {
    match parse_timestamp(value) {
        Ok(dt) => dt.date_naive().format("%Y-%m-%d").to_string(),
        Err(_) => value.to_string(),
    }
}

pub fn to_utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}
