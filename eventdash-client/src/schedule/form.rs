//! State of one "create event" form, passed explicitly instead of living in globals.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use eventdash_common::EventSubmission;

use super::range::{
    self, apply_duration, apply_preset, clamp_end_to_start, duration_hours, to_wire_format, QuickPreset,
};
use super::timezone::{detect_timezone_or, minimum_selectable, resolve_timezone, FALLBACK_TIMEZONE};
use crate::config::DashConfig;
use crate::error::ValidationError;

/// Length of the default event created by [`FormSession::new`]
const DEFAULT_EVENT_HOURS: i64 = 2;

/// Which datetime input a quick-pick applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Start,
    End,
}

/// What the preview pane shows once every field is filled in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPreview {
    pub name: String,
    pub event_type: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: f64,
    pub timezone: String,
}

#[derive(Debug, Clone)]
pub struct FormSession {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Selected event definition file, e.g. "CaptureTheFlag.json"
    pub event_json: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub timezone: Option<String>,
    supported_timezones: Vec<String>,
}

impl FormSession {
    /// Fresh form with the host zone (or the fallback) selected, starting in
    /// an hour and lasting two.
    pub fn new(supported_timezones: Vec<String>, now: NaiveDateTime) -> Self {
        Self::with_fallback(supported_timezones, FALLBACK_TIMEZONE, now)
    }

    /// Like [`FormSession::new`], with the zone list and fallback from config.
    pub fn from_config(config: &DashConfig, now: NaiveDateTime) -> Self {
        Self::with_fallback(config.supported_timezones.clone(), &config.default_timezone, now)
    }

    fn with_fallback(supported_timezones: Vec<String>, fallback: &str, now: NaiveDateTime) -> Self {
        let timezone = detect_timezone_or(supported_timezones.as_slice(), fallback);
        let mut session = Self::empty(supported_timezones);
        session.timezone = Some(timezone);
        let start = apply_preset(QuickPreset::OneHour, now);
        session.start = Some(start);
        session.end = Some(start + Duration::hours(DEFAULT_EVENT_HOURS));
        session
    }

    pub fn empty(supported_timezones: Vec<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: String::new(),
            description: String::new(),
            event_json: None,
            start: None,
            end: None,
            timezone: None,
            supported_timezones,
        }
    }

    pub fn supported_timezones(&self) -> &[String] {
        &self.supported_timezones
    }

    /// Move the start; an end that is no longer after it is pushed to start + 1h.
    pub fn set_start(&mut self, start: NaiveDateTime) {
        self.start = Some(start);
        if let Some(end) = self.end {
            self.end = Some(clamp_end_to_start(start, end));
        }
    }

    pub fn set_end(&mut self, end: NaiveDateTime) {
        self.end = Some(end);
    }

    pub fn set_timezone(&mut self, timezone: impl Into<String>) {
        self.timezone = Some(timezone.into());
    }

    pub fn apply_preset(&mut self, field: TimeField, preset: QuickPreset, now: NaiveDateTime) {
        let value = apply_preset(preset, now);
        match field {
            TimeField::Start => self.set_start(value),
            TimeField::End => self.set_end(value),
        }
    }

    /// Set the end `hours` after the current start.
    pub fn set_duration(&mut self, hours: f64) -> Result<NaiveDateTime, ValidationError> {
        let end = apply_duration(self.start, hours)?;
        self.end = Some(end);
        Ok(end)
    }

    /// Select an event definition and derive the event name from it.
    pub fn select_event_file(&mut self, file: impl Into<String>) {
        let file = file.into();
        self.name = display_name(&file);
        self.event_json = Some(file);
    }

    pub fn preview(&self) -> Option<EventPreview> {
        let event_json = self.event_json.as_deref()?;
        let (start, end) = (self.start?, self.end?);
        let timezone = self.timezone.clone().filter(|tz| !tz.is_empty())?;
        if self.name.trim().is_empty() {
            return None;
        }

        Some(EventPreview {
            name: self.name.clone(),
            event_type: event_json.trim_end_matches(".json").to_string(),
            start,
            end,
            duration_hours: duration_hours(start, end),
            timezone,
        })
    }

    /// Earliest start the form accepts right now, as wall-clock time in the
    /// selected zone.
    pub fn minimum_start(&self) -> Result<NaiveDateTime, ValidationError> {
        let timezone = self
            .timezone
            .as_deref()
            .filter(|tz| !tz.trim().is_empty())
            .ok_or(ValidationError::MissingTimezone)?;
        Ok(minimum_selectable(resolve_timezone(timezone)?))
    }

    /// Validate and build the form body for `POST /create_event`.
    ///
    /// `now` is the current wall-clock time in the selected zone.
    pub fn submission(&self, now: NaiveDateTime) -> Result<EventSubmission, ValidationError> {
        range::validate(self.start, self.end, self.timezone.as_deref())?;
        let (Some(start), Some(end), Some(timezone)) = (self.start, self.end, self.timezone.as_deref()) else {
            return Err(ValidationError::MissingTimes);
        };

        if !self.supported_timezones.iter().any(|tz| tz == timezone) {
            return Err(ValidationError::UnknownTimezone(timezone.to_string()));
        }
        resolve_timezone(timezone)?;
        if start < now {
            return Err(ValidationError::StartInPast);
        }

        let wire = to_wire_format(start, end, timezone);
        tracing::debug!(
            session = %self.id,
            start = %wire.start,
            end = %wire.end,
            timezone = %wire.timezone,
            "Prepared event submission"
        );

        Ok(EventSubmission {
            name: self.name.clone(),
            description: self.description.clone(),
            event_json: self.event_json.clone().unwrap_or_default(),
            timezone: wire.timezone,
            start: wire.start,
            end: wire.end,
        })
    }
}

/// "CaptureTheFlag.json" -> "Capture The Flag"
pub fn display_name(file: &str) -> String {
    static CAPITAL: OnceLock<Option<Regex>> = OnceLock::new();
    let stem = file.trim_end_matches(".json");
    match CAPITAL.get_or_init(|| Regex::new(r"([A-Z])").ok()).as_ref() {
        Some(re) => re.replace_all(stem, " $1").trim().to_string(),
        None => stem.to_string(),
    }
}
