//! Error types for the dashboard client.
//!
//! None of these are fatal: a `ValidationError` blocks one submission, a
//! `ProbeError` degrades one probe, an `ApiError` degrades one view.

use thiserror::Error;

/// User input that violates a precondition of the scheduling form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no start time set")]
    MissingStart,

    #[error("a duration of {0} hours is out of range")]
    DurationOutOfRange(String),

    #[error("please fill in both start and end times")]
    MissingTimes,

    #[error("please select a timezone")]
    MissingTimezone,

    #[error("unsupported timezone: {0}")]
    UnknownTimezone(String),

    #[error("end time must be after start time")]
    EndNotAfterStart,

    #[error("start time is in the past")]
    StartInPast,

    #[error("invalid date/time '{0}', expected YYYY-MM-DD hh:mm AM/PM")]
    BadWireTime(String),

    #[error("{0} does not exist in timezone {1}")]
    NonexistentLocalTime(String, String),
}

/// Failure of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout
        } else if err.is_decode() {
            ProbeError::Malformed(err.to_string())
        } else {
            ProbeError::Transport(err.to_string())
        }
    }
}

/// Failure of a dashboard data request (tables, queries, submissions).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
