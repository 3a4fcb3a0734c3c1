//! Aggregates independent probes into one dashboard health view.
//!
//! Every probe invocation takes a sequence number. A finished check is only
//! stored if no newer invocation of the same probe has started since, so a
//! slow stale response never overwrites a fresher one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use eventdash_common::HealthState;

use super::probe::{Probe, ProbeResult};

/// Overall state derived from the current probe results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallHealth {
    Healthy,
    Unhealthy,
    Checking,
}

impl OverallHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallHealth::Healthy => "healthy",
            OverallHealth::Unhealthy => "unhealthy",
            OverallHealth::Checking => "checking",
        }
    }
}

impl std::fmt::Display for OverallHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any failing probe makes the whole unhealthy; otherwise any probe still
/// checking keeps it checking. `Error` counts as failing.
pub fn derive_overall<I>(states: I) -> OverallHealth
where
    I: IntoIterator<Item = HealthState>,
{
    let mut checking = false;
    for state in states {
        match state {
            HealthState::Unhealthy | HealthState::Error => return OverallHealth::Unhealthy,
            HealthState::Checking => checking = true,
            HealthState::Healthy => {}
        }
    }
    if checking {
        OverallHealth::Checking
    } else {
        OverallHealth::Healthy
    }
}

/// Overall state plus the probes responsible for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSummary {
    pub overall: OverallHealth,
    pub issues: Vec<String>,
    pub message: String,
}

impl HealthSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ProbeResult>,
    {
        let results: Vec<&ProbeResult> = results.into_iter().collect();
        let overall = derive_overall(results.iter().map(|r| r.status));
        let issues: Vec<String> = results
            .iter()
            .filter(|r| r.status.is_failing())
            .map(|r| r.probe_id.clone())
            .collect();
        let message = match overall {
            OverallHealth::Healthy => "All systems operational".to_string(),
            OverallHealth::Checking => "Checking...".to_string(),
            OverallHealth::Unhealthy => format!("Issues: {}", issues.join(", ")),
        };
        Self { overall, issues, message }
    }
}

struct Slot {
    seq: u64,
    result: ProbeResult,
}

#[derive(Default)]
struct Inner {
    probes: RwLock<BTreeMap<String, Arc<dyn Probe>>>,
    results: RwLock<BTreeMap<String, Slot>>,
    next_seq: AtomicU64,
    poller: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap to clone; clones share probes, results and the polling loop.
#[derive(Clone, Default)]
pub struct HealthAggregator {
    inner: Arc<Inner>,
}

impl HealthAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a probe. It reports `Checking` until its first result.
    pub fn register_probe(&self, probe_id: impl Into<String>, probe: impl Probe + 'static) {
        self.register_shared(probe_id, Arc::new(probe));
    }

    pub fn register_shared(&self, probe_id: impl Into<String>, probe: Arc<dyn Probe>) {
        let probe_id = probe_id.into();
        let seq = self.next_seq();
        self.inner.probes.write().insert(probe_id.clone(), probe);
        self.inner.results.write().insert(
            probe_id.clone(),
            Slot {
                seq,
                result: ProbeResult::checking(&probe_id),
            },
        );
        tracing::debug!("Registered health probe {}", probe_id);
    }

    pub fn probe_ids(&self) -> Vec<String> {
        self.inner.probes.read().keys().cloned().collect()
    }

    fn next_seq(&self) -> u64 {
        self.inner.next_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Store `result` unless a newer invocation of the same probe already has.
    fn store(&self, seq: u64, result: ProbeResult) -> bool {
        let mut results = self.inner.results.write();
        if let Some(slot) = results.get(&result.probe_id) {
            if slot.seq > seq {
                tracing::debug!(
                    "Discarding stale result for {} (seq {} < {})",
                    result.probe_id,
                    seq,
                    slot.seq
                );
                return false;
            }
        }
        results.insert(result.probe_id.clone(), Slot { seq, result });
        true
    }

    /// Run one probe. Failures become an `Error` result; nothing propagates.
    ///
    /// Returns this invocation's result even when a newer one has superseded it.
    pub async fn run_probe(&self, probe_id: &str) -> ProbeResult {
        let probe = self.inner.probes.read().get(probe_id).cloned();
        let Some(probe) = probe else {
            tracing::warn!("Health probe {} is not registered", probe_id);
            return ProbeResult::failed(probe_id, "probe not registered");
        };

        let seq = self.next_seq();
        self.store(seq, ProbeResult::checking(probe_id));

        let result = match probe.check().await {
            Ok(outcome) => ProbeResult::from_outcome(probe_id, outcome),
            Err(e) => {
                tracing::warn!("Health probe {} failed: {}", probe_id, e);
                ProbeResult::failed(probe_id, e.to_string())
            }
        };

        self.store(seq, result.clone());
        result
    }

    /// Run every registered probe concurrently and wait for all of them.
    pub async fn run_all(&self) -> BTreeMap<String, ProbeResult> {
        let ids = self.probe_ids();
        join_all(ids.iter().map(|id| self.run_probe(id))).await;
        self.snapshot()
    }

    pub fn snapshot(&self) -> BTreeMap<String, ProbeResult> {
        self.inner
            .results
            .read()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.result.clone()))
            .collect()
    }

    pub fn result(&self, probe_id: &str) -> Option<ProbeResult> {
        self.inner.results.read().get(probe_id).map(|slot| slot.result.clone())
    }

    pub fn overall(&self) -> OverallHealth {
        let results = self.inner.results.read();
        derive_overall(results.values().map(|slot| slot.result.status))
    }

    pub fn summary(&self) -> HealthSummary {
        let results = self.inner.results.read();
        HealthSummary::from_results(results.values().map(|slot| &slot.result))
    }

    /// Run all probes now and then every `every`, replacing any running loop.
    ///
    /// Each tick spawns its own cycle, so a slow probe may overlap the next
    /// tick. Must be called from within a tokio runtime.
    pub fn start_polling(&self, every: Duration) {
        let every = every.max(Duration::from_millis(1));
        let aggregator = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let cycle = aggregator.clone();
                tokio::spawn(async move {
                    cycle.run_all().await;
                    let summary = cycle.summary();
                    match summary.overall {
                        OverallHealth::Unhealthy => tracing::warn!("Health: {}", summary.message),
                        _ => tracing::info!("Health: {}", summary.message),
                    }
                });
            }
        });

        if let Some(previous) = self.inner.poller.lock().replace(handle) {
            previous.abort();
            tracing::info!("Replaced health polling loop (every {:?})", every);
        } else {
            tracing::info!("Started health polling (every {:?})", every);
        }
    }

    /// Stop the polling loop. Safe to call when none is running.
    pub fn stop_polling(&self) {
        if let Some(handle) = self.inner.poller.lock().take() {
            handle.abort();
            tracing::info!("Stopped health polling");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.lock().is_some()
    }
}
