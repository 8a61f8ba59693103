//! Date parsing and formatting for date-registered attributes.
//!
//! Incoming values are accepted as RFC 3339 timestamps, in the attribute's configured
//! `chrono` format, or in a handful of common ISO-like layouts. Parsed values keep the offset
//! they were written with; values without one are taken as UTC.
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use std::fmt::Write;

const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses `raw`, trying the configured `format` before the fallbacks.
pub fn parse(raw: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, format) {
        return Some(dt);
    }

    std::iter::once(format)
        .chain(FALLBACK_FORMATS.iter().copied())
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            std::iter::once(format)
                .chain(FALLBACK_DATE_FORMATS.iter().copied())
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Formats `value` with `format`, in the value's own offset.
///
/// Returns `None` when the format is invalid.
pub fn format(value: &DateTime<FixedOffset>, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", value.format(format)).ok()?;
    Some(out)
}
