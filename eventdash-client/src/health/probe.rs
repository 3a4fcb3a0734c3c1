//! Probe abstraction and the per-probe result record.

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventdash_common::HealthState;

use crate::error::ProbeError;

/// How a probe endpoint reports health
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// `{"healthy": bool, ...}` as served by `/api/health/*`
    #[default]
    HealthFlag,
    /// `{"status": "Running" | "Not Running"}` as served by `/api/event_handler_status`
    HandlerStatus,
}

/// What a probe found, before the aggregator stamps it with an id and time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub detail: BTreeMap<String, String>,
}

impl ProbeOutcome {
    pub fn healthy() -> Self {
        Self { healthy: true, detail: BTreeMap::new() }
    }

    pub fn unhealthy() -> Self {
        Self { healthy: false, detail: BTreeMap::new() }
    }

    pub fn with_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.detail.insert(label.into(), value.into());
        self
    }
}

/// Latest known state of one probe. Replaced wholesale on every check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub probe_id: String,
    pub status: HealthState,
    pub checked_at: DateTime<Utc>,
    pub detail: BTreeMap<String, String>,
}

impl ProbeResult {
    pub const ERROR_LABEL: &'static str = "Error";

    pub fn checking(probe_id: &str) -> Self {
        Self {
            probe_id: probe_id.to_string(),
            status: HealthState::Checking,
            checked_at: Utc::now(),
            detail: BTreeMap::new(),
        }
    }

    pub fn from_outcome(probe_id: &str, outcome: ProbeOutcome) -> Self {
        Self {
            probe_id: probe_id.to_string(),
            status: HealthState::from_healthy(outcome.healthy),
            checked_at: Utc::now(),
            detail: outcome.detail,
        }
    }

    /// Synthetic result for a probe whose check could not complete.
    pub fn failed(probe_id: &str, message: impl Into<String>) -> Self {
        let mut detail = BTreeMap::new();
        detail.insert(Self::ERROR_LABEL.to_string(), message.into());
        Self {
            probe_id: probe_id.to_string(),
            status: HealthState::Error,
            checked_at: Utc::now(),
            detail,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.detail.get(Self::ERROR_LABEL).map(String::as_str)
    }
}

/// One independent health check against a backend dependency.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> Result<ProbeOutcome, ProbeError>;
}

/// Adapts an async closure into a [`Probe`].
pub struct FnProbe<F> {
    check: F,
}

impl<F> FnProbe<F> {
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeOutcome, ProbeError>> + Send,
{
    async fn check(&self) -> Result<ProbeOutcome, ProbeError> {
        (self.check)().await
    }
}
