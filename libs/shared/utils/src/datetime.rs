use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp into a naive wall-clock value.
///
/// Values carrying an offset keep their local wall-clock part; nothing is
/// converted between zones.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    let value = value.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Ok(with_offset.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("'{}' is not a valid ISO-8601 timestamp", value))
}

/// Parse a calendar date from either `YYYY-MM-DD` or a full ISO-8601
/// timestamp, keeping only the date portion.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Ok(date);
    }

    parse_timestamp(value)
        .map(|timestamp| timestamp.date())
        .map_err(|_| format!("'{}' is not a valid date", value))
}
