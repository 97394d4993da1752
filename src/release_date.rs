//! Release date parsing and rendering
//!
//! Providers report release dates in different shapes: OMDb uses ISO dates or
//! `01 Jan 2000` style dates, MyAPIFilms uses compact `YYYYMMDD` strings, and
//! both use `N/A` for unknown dates. Everything is normalized to a
//! [`NaiveDate`] and rendered back as zero-padded `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, Utc};

/// Marker providers use for an unknown release date
pub const NOT_AVAILABLE: &str = "N/A";

/// Parses an OMDb-style release date
///
/// Accepts `YYYY-MM-DD` and `DD Mon YYYY`. Returns `None` for the
/// [`NOT_AVAILABLE`] marker and anything unparseable.
pub fn parse_release(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || raw == NOT_AVAILABLE {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d %b %Y"))
        .ok()
}

/// Parses a compact `YYYYMMDD` release date
///
/// Characters 0-3 are the year, 4-5 the month and 6-7 the day. Anything
/// after the eighth character is ignored.
pub fn parse_compact(raw: &str) -> Option<NaiveDate> {
    let digits = raw.trim().get(..8)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year = digits[0..4].parse().ok()?;
    let month = digits[4..6].parse().ok()?;
    let day = digits[6..8].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Returns true if an episode released on `date` had aired by `now`
///
/// The release is taken to happen at midnight UTC and must lie strictly
/// before `now`.
pub fn has_aired(date: NaiveDate, now: DateTime<Utc>) -> bool {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc() < now)
        .unwrap_or(false)
}

/// Renders `date` as zero-padded `YYYY-MM-DD`
pub fn format_release_date(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Parses any supported release date shape and renders it as `YYYY-MM-DD`
pub fn normalize_release(raw: &str) -> Option<String> {
    parse_release(raw)
        .or_else(|| parse_compact(raw))
        .map(format_release_date)
}
