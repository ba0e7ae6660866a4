//! Timestamp parsing
//!
//! Ingestion accepts whatever date spellings show up in the source data
//! ("January, 09 2017 00:00:00", ISO 8601, RFC 2822, bare dates); the API
//! only accepts ISO 8601. Naive values are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Naive date-time spellings accepted by the API, tried in order
const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Additional date-time spellings seen in exported datasets
const LOOSE_DATETIME_FORMATS: &[&str] = &[
    "%B, %d %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%B %d %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%B, %d %Y %H:%M",
    "%B %d, %Y %H:%M",
];

const LOOSE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B, %d %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%m/%d/%Y",
];

/// Parse an ISO 8601 timestamp, with or without an offset.
pub fn parse_datetime_iso(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Offsets without a colon, e.g. 2017-01-09T00:00:00+0000
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    parse_naive(s, ISO_DATETIME_FORMATS).or_else(|| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    })
}

/// Best-effort parse of a human or machine written timestamp.
///
/// Returns `None` for anything it cannot make sense of; callers treat that as
/// a missing value rather than an error.
pub fn parse_datetime_lenient(input: &str) -> Option<DateTime<Utc>> {
    if let Some(dt) = parse_datetime_iso(input) {
        return Some(dt);
    }

    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = parse_naive(s, LOOSE_DATETIME_FORMATS) {
        return Some(dt);
    }

    LOOSE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn parse_naive(s: &str, formats: &[&str]) -> Option<DateTime<Utc>> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
