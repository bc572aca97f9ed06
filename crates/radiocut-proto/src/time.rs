//! Radiocut timestamp helpers.
//!
//! Radiocut publishes wall-clock timestamps with an explicit offset
//! (`2016-07-09T10:00:00-03:00`) and chunk starts as Unix epochs. Epochs are
//! always rendered in the show's own offset so results do not depend on the
//! host time zone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a Radiocut timestamp, keeping its offset.
pub fn parse_datetime(s: &str) -> chrono::ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim())
}

/// Like [`parse_datetime`], but a timestamp without offset is read as wall-clock time in `fallback`.
pub fn parse_datetime_or(s: &str, fallback: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = parse_datetime(s) {
        return Some(dt);
    }
    let naive = NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT).ok()?;
    fallback.from_local_datetime(&naive).single()
}

/// Wall-clock view of a Radiocut timestamp with the offset dropped.
pub fn strip_offset(s: &str) -> chrono::ParseResult<NaiveDateTime> {
    parse_datetime(s).map(|dt| dt.naive_local())
}

pub fn to_epoch(s: &str) -> chrono::ParseResult<i64> {
    parse_datetime(s).map(|dt| dt.timestamp())
}

/// Epoch seconds as wall-clock time in `offset`.
pub fn epoch_to_local(epoch: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset.timestamp_opt(epoch, 0).single()
}

/// Parse `+HH:MM` / `-HH:MM` (a bare `Z` is UTC).
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match *s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// `?now=` value that makes the listing API include `date`: midnight of the next day.
pub fn listing_cutoff(date: NaiveDate) -> Option<String> {
    let next = date.succ_opt()?;
    Some(next.and_hms_opt(0, 0, 0)?.format(DATETIME_FORMAT).to_string())
}
