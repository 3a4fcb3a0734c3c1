//! Dashboard health: independent probes folded into one overall status.

pub mod aggregator;
pub mod http;
pub mod probe;

pub use aggregator::{derive_overall, HealthAggregator, HealthSummary, OverallHealth};
pub use http::HttpProbe;
pub use probe::{FnProbe, Probe, ProbeKind, ProbeOutcome, ProbeResult};
