//! Cell-level formatting rules.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;

pub const NULL_PLACEHOLDER: &str = "null";
pub const ELLIPSIS: &str = "...";

/// Columns whose values are machine timestamps
const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "sent_at", "rewarded_at"];

/// Locale-style display, e.g. "1/1/2024, 12:00:00 AM"
const DISPLAY_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

pub fn is_timestamp_column(name: &str) -> bool {
    name.contains("time") || TIMESTAMP_COLUMNS.contains(&name)
}

/// Accepts RFC 3339, naive ISO/SQL datetimes (taken as UTC), bare dates and
/// epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

pub fn format_timestamp(t: DateTime<Utc>, tz: Tz) -> String {
    t.with_timezone(&tz).format(DISPLAY_FORMAT).to_string()
}

/// `Some(first max chars + "...")` when `s` is longer than `max` characters.
pub fn truncate(s: &str, max: usize) -> Option<String> {
    let mut chars = s.char_indices();
    match chars.nth(max) {
        Some((cut, _)) => Some(format!("{}{}", &s[..cut], ELLIPSIS)),
        None => None,
    }
}

/// Scalar as shown to a user; nested JSON falls back to its compact form.
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => NULL_PLACEHOLDER.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
