//! Timezone selection for the scheduling form.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::ValidationError;

/// Zone used when the host zone is not one the backend accepts.
pub const FALLBACK_TIMEZONE: &str = "US/Eastern";

/// Zones offered by the form when the config does not list its own.
pub const DEFAULT_SUPPORTED_TIMEZONES: &[&str] = &[
    "US/Eastern",
    "US/Central",
    "US/Mountain",
    "US/Pacific",
    "US/Alaska",
    "US/Hawaii",
    "UTC",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Australia/Sydney",
];

/// Pick the host's IANA zone if the backend supports it, else [`FALLBACK_TIMEZONE`].
pub fn detect_timezone<S: AsRef<str>>(supported: &[S]) -> String {
    detect_timezone_or(supported, FALLBACK_TIMEZONE)
}

pub fn detect_timezone_or<S: AsRef<str>>(supported: &[S], fallback: &str) -> String {
    let host = match iana_time_zone::get_timezone() {
        Ok(tz) => Some(tz),
        Err(e) => {
            tracing::debug!("Could not resolve host timezone: {}", e);
            None
        }
    };
    select_timezone(host.as_deref(), supported, fallback)
}

/// The decision behind [`detect_timezone_or`], with the host zone passed in.
pub fn select_timezone<S: AsRef<str>>(host: Option<&str>, supported: &[S], fallback: &str) -> String {
    match host {
        Some(host) if supported.iter().any(|tz| tz.as_ref() == host) => host.to_string(),
        _ => fallback.to_string(),
    }
}

pub fn resolve_timezone(id: &str) -> Result<Tz, ValidationError> {
    id.trim()
        .parse::<Tz>()
        .map_err(|_| ValidationError::UnknownTimezone(id.to_string()))
}

/// Earliest wall-clock value the form lets a user pick in `tz`: the current minute.
pub fn minimum_selectable(tz: Tz) -> NaiveDateTime {
    minimum_selectable_at(Utc::now(), tz)
}

pub fn minimum_selectable_at(now: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    let local = now.with_timezone(&tz).naive_local();
    local
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(local)
}
