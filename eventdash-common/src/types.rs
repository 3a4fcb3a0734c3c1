use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// State of a single health probe as shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    #[serde(rename = "checking")]
    Checking,
    #[serde(rename = "healthy")]
    Healthy,
    #[serde(rename = "unhealthy")]
    Unhealthy,
    #[serde(rename = "error")]
    Error,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Checking => "checking",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Error => "error",
        }
    }

    pub fn from_healthy(healthy: bool) -> Self {
        if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }

    /// Anything that is neither healthy nor still being checked.
    pub fn is_failing(&self) -> bool {
        matches!(self, HealthState::Unhealthy | HealthState::Error)
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HealthState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(HealthState::Checking),
            "healthy" => Ok(HealthState::Healthy),
            "unhealthy" => Ok(HealthState::Unhealthy),
            "error" => Ok(HealthState::Error),
            _ => Err(format!("Unknown health state: {}", s)),
        }
    }
}

/// Body returned by `/api/health/*` endpoints.
///
/// Only `healthy` is guaranteed; everything else is probe specific and kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub healthy: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProbeReport {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn error(&self) -> Option<&str> {
        self.str_field("error")
    }

    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
    }

    pub fn server_ip(&self) -> Option<&str> {
        self.str_field("server_ip")
    }

    pub fn player_count(&self) -> Option<u64> {
        self.extra.get("player_count").and_then(Value::as_u64)
    }
}

/// Body of `/api/event_handler_status`, e.g. `{"status": "Running"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerStatusReport {
    pub status: String,
}

impl HandlerStatusReport {
    pub const RUNNING: &'static str = "Running";
    pub const NOT_RUNNING: &'static str = "Not Running";

    pub fn is_running(&self) -> bool {
        self.status == Self::RUNNING
    }
}

/// Body of the start/stop handler endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: bool,
    /// Handler status after the action, `Running` or `Not Running`
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `/api/database/table/<name>` and `/api/database/enhanced-table/<name>`.
///
/// Rows are left as raw JSON: the backend sends either objects keyed by column
/// or plain arrays, and the presenter decides which.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableResponse {
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/database/query`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request body of `POST /api/database/query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Form fields of `POST /create_event`.
///
/// `start` and `end` are naive wall-clock strings (`YYYY-MM-DD hh:mm AM/PM`)
/// that the backend interprets in `timezone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubmission {
    pub name: String,
    pub description: String,
    pub event_json: String,
    pub timezone: String,
    pub start: String,
    pub end: String,
}

/// Body of `GET /api/database/info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub row_counts: Map<String, Value>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub size_mb: Option<f64>,
}

impl DatabaseInfo {
    pub fn row_count(&self, table: &str) -> Option<u64> {
        self.row_counts.get(table).and_then(Value::as_u64)
    }
}

/// Where an event stands, as computed by the backend for `/api/calendar`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Future,
    Ongoing,
    /// Start has passed but the handler has not picked the event up
    ShouldBeOngoing,
    Completed,
    Past,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Future => "future",
            EventStatus::Ongoing => "ongoing",
            EventStatus::ShouldBeOngoing => "should_be_ongoing",
            EventStatus::Completed => "completed",
            EventStatus::Past => "past",
        }
    }
}

/// One entry of `GET /api/calendar`. `start` and `end` are UTC ISO strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    #[serde(default)]
    pub unique_event_name: String,
    pub name: String,
    #[serde(default)]
    pub event_json: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub event_in_progress: bool,
    #[serde(default)]
    pub event_started: bool,
    #[serde(default)]
    pub event_over: bool,
    #[serde(default)]
    pub last_scoreboard_time: Option<String>,
    #[serde(default)]
    pub status: Option<EventStatus>,
}

/// One entry of `GET /api/winners`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub id: i64,
    pub event_id: i64,
    #[serde(default)]
    pub unique_event_name: String,
    #[serde(default)]
    pub event_name: String,
    pub player_name: String,
    #[serde(default)]
    pub final_score: Option<i64>,
    #[serde(default)]
    pub was_online: bool,
    #[serde(default)]
    pub rewarded_at: Option<String>,
    #[serde(default)]
    pub reward_cmd: Option<String>,
}

/// One entry of `GET /api/logs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
    pub log_level: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [{}] {}", self.timestamp, self.log_level, self.message)
    }
}

/// Body of `GET /api/health/overall`, the backend's own roll-up of the
/// minecraft and rcon checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallHealthReport {
    pub healthy: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub minecraft: Option<ProbeReport>,
    #[serde(default)]
    pub rcon: Option<ProbeReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_report_keeps_extra_fields() {
        let report: ProbeReport = serde_json::from_str(
            r#"{"healthy": false, "status": "offline", "error": "Cannot connect", "server_ip": "10.0.0.2"}"#,
        )
        .unwrap();
        assert!(!report.healthy);
        assert_eq!(report.error(), Some("Cannot connect"));
        assert_eq!(report.server_ip(), Some("10.0.0.2"));
        assert_eq!(report.player_count(), None);
    }

    #[test]
    fn test_probe_report_requires_healthy() {
        assert!(serde_json::from_str::<ProbeReport>(r#"{"status": "online"}"#).is_err());
    }

    #[test]
    fn test_table_response_tolerates_missing_fields() {
        let table: TableResponse = serde_json::from_str(r#"{"error": "no such table"}"#).unwrap();
        assert!(table.columns.is_none());
        assert!(table.rows.is_empty());
        assert_eq!(table.error.as_deref(), Some("no such table"));
    }

    #[test]
    fn test_health_state_from_str() {
        assert_eq!("Healthy".parse::<HealthState>().unwrap(), HealthState::Healthy);
        assert!("bogus".parse::<HealthState>().is_err());
        assert!(HealthState::Error.is_failing());
        assert!(!HealthState::Checking.is_failing());
    }

    #[test]
    fn test_calendar_event_status() {
        let event: CalendarEvent = serde_json::from_str(
            r#"{"id": 3, "unique_event_name": "Mining-Race-06-01-2030-1600", "name": "Mining Race",
                "start": "2030-06-01T16:00:00Z", "end": "2030-06-01T18:00:00Z",
                "event_in_progress": false, "event_started": false, "event_over": false,
                "last_scoreboard_time": null, "status": "should_be_ongoing"}"#,
        )
        .unwrap();
        assert_eq!(event.status, Some(EventStatus::ShouldBeOngoing));
        assert_eq!(EventStatus::ShouldBeOngoing.as_str(), "should_be_ongoing");
        assert!(event.description.is_none());
    }

    #[test]
    fn test_log_entry_display() {
        let entry = LogEntry {
            timestamp: "2024-05-01 12:00:00".to_string(),
            message: "Event handler started".to_string(),
            log_level: "INFO".to_string(),
        };
        assert_eq!(entry.to_string(), "2024-05-01 12:00:00: [INFO] Event handler started");
    }

    #[test]
    fn test_database_info_row_count() {
        let info: DatabaseInfo = serde_json::from_str(
            r#"{"tables": ["events", "logs"], "row_counts": {"events": 4, "logs": 120}, "size_mb": 0.5}"#,
        )
        .unwrap();
        assert_eq!(info.row_count("logs"), Some(120));
        assert_eq!(info.row_count("winners"), None);
        assert_eq!(info.size_bytes, None);
    }

    #[test]
    fn test_handler_status_running() {
        let status: HandlerStatusReport = serde_json::from_str(r#"{"status": "Running"}"#).unwrap();
        assert!(status.is_running());
        let status = HandlerStatusReport { status: HandlerStatusReport::NOT_RUNNING.to_string() };
        assert!(!status.is_running());
    }
}
