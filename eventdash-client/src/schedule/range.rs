//! Time range arithmetic and the start/end wire contract.
//!
//! Every value here is a naive wall-clock time in the zone the user picked.
//! The zone itself travels separately, so the functions never convert.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};
use serde::{Deserialize, Serialize};

use super::timezone::resolve_timezone;
use crate::error::ValidationError;

/// `YYYY-MM-DD hh:mm AM/PM`, the format the backend parses.
pub const WIRE_FORMAT: &str = "%Y-%m-%d %I:%M %p";
/// UTC rendering the backend stores after localizing.
pub const UTC_WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Duration used when the end has to be pulled after a moved start.
pub const DEFAULT_FALLBACK_HOURS: i64 = 1;

/// Quick-pick buttons of the scheduling form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickPreset {
    /// Five minutes from now
    Soon,
    OneHour,
    Tomorrow9am,
    /// Next Saturday strictly after today, 10:00
    NextSaturday10am,
}

pub fn apply_preset(preset: QuickPreset, now: NaiveDateTime) -> NaiveDateTime {
    match preset {
        QuickPreset::Soon => now + Duration::minutes(5),
        QuickPreset::OneHour => now + Duration::minutes(60),
        QuickPreset::Tomorrow9am => at_time(now + Duration::days(1), 9),
        QuickPreset::NextSaturday10am => {
            let weekday = now.weekday().num_days_from_sunday() as i64;
            let offset = match (6 - weekday).rem_euclid(7) {
                0 => 7,
                n => n,
            };
            at_time(now + Duration::days(offset), 10)
        }
    }
}

fn at_time(day: NaiveDateTime, hour: u32) -> NaiveDateTime {
    day.date().and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default())
}

/// `start + hours`; fractional hours are honoured to the millisecond.
pub fn apply_duration(start: Option<NaiveDateTime>, hours: f64) -> Result<NaiveDateTime, ValidationError> {
    let start = start.ok_or(ValidationError::MissingStart)?;
    let out_of_range = || ValidationError::DurationOutOfRange(hours.to_string());

    let millis = hours * 3_600_000.0;
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    Duration::try_milliseconds(millis.round() as i64)
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or_else(out_of_range)
}

/// Keep `end` strictly after `start`, defaulting to a one hour event.
pub fn clamp_end_to_start(start: NaiveDateTime, end: NaiveDateTime) -> NaiveDateTime {
    if end <= start {
        start + Duration::hours(DEFAULT_FALLBACK_HOURS)
    } else {
        end
    }
}

/// Checks, in order: both times present, zone present, end after start.
pub fn validate(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    timezone: Option<&str>,
) -> Result<(), ValidationError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ValidationError::MissingTimes);
    };
    if timezone.map_or(true, |tz| tz.trim().is_empty()) {
        return Err(ValidationError::MissingTimezone);
    }
    if end <= start {
        return Err(ValidationError::EndNotAfterStart);
    }
    Ok(())
}

/// Start/end as sent to the backend: naive local strings plus the zone they are in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTimeRange {
    pub start: String,
    pub end: String,
    pub timezone: String,
}

pub fn to_wire_format(start: NaiveDateTime, end: NaiveDateTime, timezone: &str) -> WireTimeRange {
    WireTimeRange {
        start: format_wire(start),
        end: format_wire(end),
        timezone: timezone.to_string(),
    }
}

pub fn format_wire(t: NaiveDateTime) -> String {
    t.format(WIRE_FORMAT).to_string()
}

impl WireTimeRange {
    pub fn parse_local(value: &str) -> Result<NaiveDateTime, ValidationError> {
        NaiveDateTime::parse_from_str(value.trim(), WIRE_FORMAT)
            .map_err(|_| ValidationError::BadWireTime(value.to_string()))
    }

    /// Interpret both ends in `self.timezone` and convert to UTC, the way
    /// the backend localizes them.
    ///
    /// Around DST changes standard time wins: a repeated local time takes its
    /// standard-time instant, and a skipped one is read with the standard offset.
    pub fn to_utc(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
        let tz = resolve_timezone(&self.timezone)?;
        let localize = |value: &str| -> Result<DateTime<Utc>, ValidationError> {
            let naive = Self::parse_local(value)?;
            localize_standard(tz, naive)
                .ok_or_else(|| ValidationError::NonexistentLocalTime(value.to_string(), self.timezone.clone()))
        };
        Ok((localize(&self.start)?, localize(&self.end)?))
    }
}

fn localize_standard(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, later) => {
            let standard = if earlier.offset().dst_offset().is_zero() { earlier } else { later };
            Some(standard.with_timezone(&Utc))
        }
        LocalResult::None => {
            let standard = tz.offset_from_utc_datetime(&naive).base_utc_offset();
            naive.checked_sub_signed(standard).map(|t| t.and_utc())
        }
    }
}

pub fn utc_wire(t: DateTime<Utc>) -> String {
    t.format(UTC_WIRE_FORMAT).to_string()
}

/// Length of a range in hours, rounded to one decimal.
pub fn duration_hours(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let minutes = (end - start).num_minutes() as f64;
    (minutes / 60.0 * 10.0).round() / 10.0
}
