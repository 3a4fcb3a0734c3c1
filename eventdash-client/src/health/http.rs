//! Probes backed by the dashboard's JSON health endpoints.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use eventdash_common::{HandlerStatusReport, ProbeReport};

use super::probe::{Probe, ProbeKind, ProbeOutcome};
use crate::config::{DashConfig, ProbeConfig};
use crate::error::ProbeError;

pub struct HttpProbe {
    client: Client,
    url: String,
    kind: ProbeKind,
}

impl HttpProbe {
    pub fn new(client: Client, url: impl Into<String>, kind: ProbeKind) -> Self {
        Self {
            client,
            url: url.into(),
            kind,
        }
    }

    pub fn from_config(client: Client, config: &DashConfig, probe: &ProbeConfig) -> Self {
        Self::new(client, config.endpoint(&probe.path), probe.kind)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self) -> Result<ProbeOutcome, ProbeError> {
        let started = Instant::now();
        let response = self.client.get(&self.url).send().await?;
        let elapsed = started.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::HttpStatus(status.as_u16()));
        }
        let body = response.text().await?;

        match self.kind {
            ProbeKind::HealthFlag => {
                let report: ProbeReport =
                    serde_json::from_str(&body).map_err(|e| ProbeError::Malformed(e.to_string()))?;
                Ok(health_flag_outcome(&report, elapsed))
            }
            ProbeKind::HandlerStatus => {
                let report: HandlerStatusReport =
                    serde_json::from_str(&body).map_err(|e| ProbeError::Malformed(e.to_string()))?;
                Ok(handler_status_outcome(&report))
            }
        }
    }
}

fn health_flag_outcome(report: &ProbeReport, elapsed: Duration) -> ProbeOutcome {
    let mut outcome = if report.healthy {
        ProbeOutcome::healthy()
    } else {
        ProbeOutcome::unhealthy().with_detail("Error", report.error().unwrap_or("Connection failed"))
    };
    outcome = outcome.with_detail("Response Time", format!("{}ms", elapsed.as_millis()));

    if let Some(message) = report.message() {
        outcome = outcome.with_detail("Message", message);
    }
    if let Some(ip) = report.server_ip() {
        outcome = outcome.with_detail("Server IP", ip);
    }
    if let Some(players) = report.player_count() {
        outcome = outcome.with_detail("Players Online", players.to_string());
    }
    outcome
}

fn handler_status_outcome(report: &HandlerStatusReport) -> ProbeOutcome {
    let outcome = if report.is_running() {
        ProbeOutcome::healthy()
    } else {
        ProbeOutcome::unhealthy()
    };
    outcome.with_detail("Status", report.status.clone())
}
