//! Event scheduling: timezone choice, time range rules and the form session.

pub mod form;
pub mod range;
pub mod timezone;

pub use form::{display_name, EventPreview, FormSession, TimeField};
pub use range::{
    apply_duration, apply_preset, clamp_end_to_start, duration_hours, to_wire_format, validate, QuickPreset,
    WireTimeRange,
};
pub use timezone::{detect_timezone, detect_timezone_or, minimum_selectable, resolve_timezone, FALLBACK_TIMEZONE};
