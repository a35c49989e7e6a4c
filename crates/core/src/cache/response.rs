//! Buffered response snapshots.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fully buffered HTTP response: status, headers, opaque body.
///
/// Snapshots are never mutated after they are stored; writing the same key
/// again replaces the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Only a plain 200 is ever written to a partition.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// Timestamp carried by the response's own `Date` header.
    ///
    /// Returns `None` when the header is absent or not an HTTP date.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("date").and_then(parse_http_date)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Obsolete `Date` layouts that recipients must still accept.
const RFC850_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ASCTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Parse an HTTP `Date` value: IMF-fixdate, RFC 850, or asctime.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    // asctime pads single-digit days with a second space
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    [RFC850_FORMAT, ASCTIME_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&collapsed, format).ok())
        .map(|naive| naive.and_utc())
}

/// Format a timestamp as an IMF-fixdate `Date` header value.
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
