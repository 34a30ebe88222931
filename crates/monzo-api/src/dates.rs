//! Timestamp helpers
//!
//! Monzo sends RFC 3339 timestamps and accepts `since`/`before` filters in
//! `%Y-%m-%dT%H:%M:%SZ`. Some optional timestamps come back as `""` instead
//! of being omitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Query-string format for date filters.
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format a timestamp for a `since`/`before` filter.
pub fn format_query_date(date: &DateTime<Utc>) -> String {
    date.format(QUERY_DATE_FORMAT).to_string()
}

/// Deserialize an optional timestamp, treating `""` and `null` as absent.
pub(crate) fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}
