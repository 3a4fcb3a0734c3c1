use std::sync::OnceLock;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::health::ProbeKind;
use crate::schedule::timezone::{DEFAULT_SUPPORTED_TIMEZONES, FALLBACK_TIMEZONE};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    /// Root of the dashboard backend, e.g. "http://127.0.0.1:5000"
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Zone pre-selected when the host zone is not in `supported_timezones`
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    /// Zones offered by the scheduling form; must match what the backend accepts
    #[serde(default = "default_supported_timezones")]
    pub supported_timezones: Vec<String>,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub table: TableConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_probes")]
    pub probes: Vec<ProbeConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub id: String,
    /// Path relative to `base_url`
    pub path: String,
    #[serde(default)]
    pub kind: ProbeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_table_limit")]
    pub default_limit: u32,

    #[serde(default = "default_truncate_at")]
    pub truncate_at: usize,

    /// Zone used to display timestamp cells
    #[serde(default = "default_display_timezone")]
    pub display_timezone: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_timezone() -> String {
    FALLBACK_TIMEZONE.to_string()
}

fn default_supported_timezones() -> Vec<String> {
    DEFAULT_SUPPORTED_TIMEZONES.iter().map(|tz| tz.to_string()).collect()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_probes() -> Vec<ProbeConfig> {
    vec![
        ProbeConfig {
            id: "minecraft".to_string(),
            path: "/api/health/minecraft".to_string(),
            kind: ProbeKind::HealthFlag,
        },
        ProbeConfig {
            id: "rcon".to_string(),
            path: "/api/health/rcon".to_string(),
            kind: ProbeKind::HealthFlag,
        },
        ProbeConfig {
            id: "event_handler".to_string(),
            path: "/api/event_handler_status".to_string(),
            kind: ProbeKind::HandlerStatus,
        },
    ]
}

fn default_table_limit() -> u32 {
    50
}

fn default_truncate_at() -> usize {
    100
}

fn default_display_timezone() -> String {
    "UTC".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            probes: default_probes(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_limit: default_table_limit(),
            truncate_at: default_truncate_at(),
            display_timezone: default_display_timezone(),
        }
    }
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            default_timezone: default_timezone(),
            supported_timezones: default_supported_timezones(),
            health: HealthConfig::default(),
            table: TableConfig::default(),
        }
    }
}

impl DashConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        let config: DashConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path))?;
        Ok(config)
    }

    /// Full URL for a backend path such as `/api/health/rcon`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

pub static CONFIG: OnceLock<DashConfig> = OnceLock::new();

/// Load `path` into [`CONFIG`]. A missing file falls back to defaults; a
/// malformed one is an error.
pub fn read_config(path: &str) -> anyhow::Result<&'static DashConfig> {
    let config = if std::path::Path::new(path).exists() {
        DashConfig::from_file(path)?
    } else {
        tracing::warn!("Config file {} not found, using defaults", path);
        DashConfig::default()
    };

    Ok(CONFIG.get_or_init(|| config))
}
