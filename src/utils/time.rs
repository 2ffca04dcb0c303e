/// Timestamp parsing and formatting at the feed and store boundaries
use chrono::{NaiveDate, NaiveDateTime};

/// Canonical record timestamp, full time-of-day, no offset
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Date-only form used for document ids
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a feed publication timestamp.
///
/// Any `+HH:MM`/`-HH:MM` offset or trailing `Z` is cut off and the wall-clock
/// time is kept as published. A bare date is taken as midnight.
pub fn parse_feed_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    // Offsets start after the `YYYY-MM-DD` part, whose dashes must survive
    let naive = match raw
        .get(10..)
        .and_then(|time| time.find(|c: char| matches!(c, '+' | '-' | 'Z')))
    {
        Some(pos) => &raw[..10 + pos],
        None => raw,
    };
    if naive.is_empty() {
        return None;
    }

    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(naive, DAY_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn format_timestamp(date: NaiveDateTime) -> String {
    date.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}
