//! HTTP client for the dashboard backend's data and control endpoints.

use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use eventdash_common::{
    ActionResponse, CalendarEvent, DatabaseInfo, EventSubmission, HandlerStatusReport, LogEntry, OverallHealthReport,
    QueryRequest, QueryResponse, TableResponse, WinnerRecord,
};

use crate::config::DashConfig;
use crate::error::ApiError;
use crate::schedule::FormSession;

/// Tables the backend serves joined with their event names
pub const ENHANCED_TABLES: &[&str] = &["event_notifications", "event_winners", "event_tasks"];

/// Rows requested when the caller does not ask for a specific count
pub const DEFAULT_TABLE_LIMIT: u32 = 50;

const CREATE_EVENT_PATH: &str = "/create_event";
const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: Client,
    base_url: String,
    table_limit: u32,
}

impl DashboardClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            table_limit: DEFAULT_TABLE_LIMIT,
        }
    }

    pub fn with_table_limit(mut self, limit: u32) -> Self {
        self.table_limit = limit;
        self
    }

    pub fn from_config(config: &DashConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.health.request_timeout_secs))
            .build()?;
        Ok(Self::new(client, config.base_url.clone()).with_table_limit(config.table.default_limit))
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.client.get(self.url(path)).send().await?;
        read_json(response).await
    }

    async fn get_text(&self, path: &str) -> Result<String, ApiError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    pub fn table_path(name: &str) -> String {
        if ENHANCED_TABLES.contains(&name) {
            format!("/api/database/enhanced-table/{}", name)
        } else {
            format!("/api/database/table/{}", name)
        }
    }

    /// One page of a table, newest first; `None` uses the configured limit.
    pub async fn fetch_table(&self, name: &str, limit: Option<u32>) -> Result<TableResponse, ApiError> {
        let limit = limit.unwrap_or(self.table_limit);
        tracing::debug!("Fetching table {} (limit {})", name, limit);
        let response = self
            .client
            .get(self.url(&Self::table_path(name)))
            .query(&[("limit", limit)])
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn run_query(&self, sql: &str) -> Result<QueryResponse, ApiError> {
        let request = QueryRequest { query: sql.trim().to_string() };
        let response = self
            .client
            .post(self.url("/api/database/query"))
            .json(&request)
            .send()
            .await?;
        read_json(response).await
    }

    /// Table names with their row counts and the database file size.
    pub async fn database_info(&self) -> Result<DatabaseInfo, ApiError> {
        self.get_json("/api/database/info").await
    }

    /// Every scheduled event, newest start first, with its computed status.
    pub async fn calendar(&self) -> Result<Vec<CalendarEvent>, ApiError> {
        self.get_json("/api/calendar").await
    }

    pub async fn winners(&self) -> Result<Vec<WinnerRecord>, ApiError> {
        self.get_json("/api/winners").await
    }

    /// Latest event handler log lines, newest first.
    pub async fn logs(&self) -> Result<Vec<LogEntry>, ApiError> {
        self.get_json("/api/logs").await
    }

    /// Plain text of one log file; `handler_logs.txt` is rendered from the log table.
    pub async fn log_content(&self, file: &str) -> Result<String, ApiError> {
        self.get_text(&format!("/api/log_content/{}", file)).await
    }

    /// The backend's own minecraft + rcon roll-up, independent of local probes.
    pub async fn overall_health(&self) -> Result<OverallHealthReport, ApiError> {
        self.get_json("/api/health/overall").await
    }

    /// Event definition files available to new events, e.g. `["MiningRace.json"]`
    pub async fn event_files(&self) -> Result<Vec<String>, ApiError> {
        self.get_json("/api/event_files").await
    }

    /// Raw JSON text of one event definition file.
    pub async fn event_json_content(&self, file: &str) -> Result<String, ApiError> {
        let body = self.get_text(&format!("/api/event_json_content/{}", file)).await?;
        serde_json::from_str::<Value>(&body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        Ok(body)
    }

    pub async fn handler_status(&self) -> Result<HandlerStatusReport, ApiError> {
        self.get_json("/api/event_handler_status").await
    }

    pub async fn start_event_handler(&self) -> Result<ActionResponse, ApiError> {
        self.handler_action("/api/event_handler/start").await
    }

    pub async fn stop_event_handler(&self) -> Result<ActionResponse, ApiError> {
        self.handler_action("/api/event_handler/stop").await
    }

    async fn handler_action(&self, path: &str) -> Result<ActionResponse, ApiError> {
        let response = self.client.post(self.url(path)).send().await?;
        let action: ActionResponse = read_json(response).await?;
        if !action.success {
            let status = action.status.as_deref().unwrap_or("unknown");
            return Err(ApiError::Backend(format!("{} failed, handler is {}", path, status)));
        }
        tracing::info!("{} succeeded", path);
        Ok(action)
    }

    /// Posts the event form. The backend answers with a redirect: back to the
    /// form on rejection, to the dashboard on success.
    pub async fn submit_event(&self, submission: &EventSubmission) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(CREATE_EVENT_PATH))
            .form(submission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }
        match response.url().path() {
            CREATE_EVENT_PATH => Err(ApiError::Backend(format!("event '{}' was rejected", submission.name))),
            LOGIN_PATH => Err(ApiError::Backend("login required".to_string())),
            _ => {
                tracing::info!(
                    "Submitted event '{}' ({} to {} {})",
                    submission.name,
                    submission.start,
                    submission.end,
                    submission.timezone
                );
                Ok(())
            }
        }
    }

    /// Validates the form as of `now` and submits it.
    pub async fn schedule_event(&self, form: &FormSession, now: NaiveDateTime) -> Result<EventSubmission, ApiError> {
        let submission = form.submission(now)?;
        self.submit_event(&submission).await?;
        Ok(submission)
    }

    /// [`DashboardClient::schedule_event`] against the current time in the form's zone.
    pub async fn schedule_event_now(&self, form: &FormSession) -> Result<EventSubmission, ApiError> {
        let now = form.minimum_start()?;
        self.schedule_event(form, now).await
    }
}

fn backend_error(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if let Some(message) = backend_error(&body) {
        return Err(ApiError::Backend(message));
    }
    if !status.is_success() {
        return Err(ApiError::HttpStatus(status.as_u16()));
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::{Form, Path, Query};
    use axum::http::StatusCode;
    use axum::response::Redirect;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::error::ValidationError;
    use crate::table::{TablePresenter, TableSpec};

    async fn serve(app: Router) -> DashboardClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let client = Client::builder().timeout(Duration::from_secs(5)).build().unwrap();
        DashboardClient::new(client, format!("http://{}/", addr))
    }

    fn table_routes() -> Router {
        Router::new()
            .route(
                "/api/database/table/{name}",
                get(|Path(name): Path<String>, Query(q): Query<HashMap<String, String>>| async move {
                    if name == "secrets" {
                        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Table not allowed"})));
                    }
                    let limit = q.get("limit").cloned().unwrap_or_default();
                    (
                        StatusCode::OK,
                        Json(json!({"table": name, "columns": ["id", "limit"], "rows": [{"id": 1, "limit": limit}], "total": 9})),
                    )
                }),
            )
            .route(
                "/api/database/enhanced-table/{name}",
                get(|Path(name): Path<String>| async move {
                    Json(json!({"table": name, "columns": ["id", "event_name"], "rows": [], "total": 0}))
                }),
            )
            .route(
                "/api/database/query",
                post(|Json(body): Json<HashMap<String, String>>| async move {
                    let query = body.get("query").cloned().unwrap_or_default();
                    if !query.to_uppercase().starts_with("SELECT") {
                        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Only SELECT queries are allowed"})));
                    }
                    (StatusCode::OK, Json(json!({"results": [{"n": 1}], "count": 1})))
                }),
            )
    }

    #[tokio::test]
    async fn test_fetch_table_routes_and_limit() {
        let client = serve(table_routes()).await;

        let table = client.fetch_table("events", Some(25)).await.unwrap();
        assert_eq!(table.columns, Some(vec!["id".to_string(), "limit".to_string()]));
        assert_eq!(table.rows[0]["limit"], "25");
        assert_eq!(table.total, Some(9));

        let table = client.fetch_table("event_winners", None).await.unwrap();
        assert_eq!(table.columns, Some(vec!["id".to_string(), "event_name".to_string()]));
        assert!(table.rows.is_empty());

        match client.fetch_table("secrets", None).await {
            Err(ApiError::Backend(message)) => assert_eq!(message, "Table not allowed"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_query() {
        let client = serve(table_routes()).await;

        let result = client.run_query("  SELECT 1 as n ").await.unwrap();
        assert_eq!(result.count, Some(1));
        assert_eq!(result.results[0]["n"], 1);

        assert!(matches!(
            client.run_query("DELETE FROM events").await,
            Err(ApiError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_event_files_and_content() {
        let app = Router::new()
            .route("/api/event_files", get(|| async { Json(json!(["MiningRace.json", "Fishing.json"])) }))
            .route(
                "/api/event_json_content/{file}",
                get(|Path(file): Path<String>| async move {
                    if file == "MiningRace.json" {
                        (StatusCode::OK, "{\n  \"type\": \"mining\"\n}".to_string())
                    } else if file == "Broken.json" {
                        (StatusCode::OK, "not json".to_string())
                    } else {
                        (StatusCode::NOT_FOUND, String::new())
                    }
                }),
            );
        let client = serve(app).await;

        assert_eq!(client.event_files().await.unwrap(), vec!["MiningRace.json", "Fishing.json"]);
        let content = client.event_json_content("MiningRace.json").await.unwrap();
        assert!(content.contains("\"mining\""));
        assert!(matches!(client.event_json_content("Nope.json").await, Err(ApiError::HttpStatus(404))));
        assert!(matches!(client.event_json_content("Broken.json").await, Err(ApiError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_handler_controls() {
        let app = Router::new()
            .route("/api/event_handler_status", get(|| async { Json(json!({"status": "Not Running"})) }))
            .route(
                "/api/event_handler/start",
                post(|| async { Json(json!({"success": true, "status": "Running"})) }),
            )
            .route(
                "/api/event_handler/stop",
                post(|| async { Json(json!({"success": false, "status": "Running"})) }),
            );
        let client = serve(app).await;

        assert!(!client.handler_status().await.unwrap().is_running());
        let started = client.start_event_handler().await.unwrap();
        assert_eq!(started.status.as_deref(), Some("Running"));
        assert!(matches!(client.stop_event_handler().await, Err(ApiError::Backend(_))));
    }

    #[tokio::test]
    async fn test_unexpected_shapes() {
        let app = Router::new()
            .route("/api/event_handler_status", get(|| async { "<html>login</html>" }))
            .route("/api/event_files", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let client = serve(app).await;

        assert!(matches!(client.handler_status().await, Err(ApiError::Malformed(_))));
        assert!(matches!(client.event_files().await, Err(ApiError::HttpStatus(500))));
    }

    fn create_event_routes() -> Router {
        Router::new()
            .route(
                "/create_event",
                post(|Form(form): Form<HashMap<String, String>>| async move {
                    let ok = form.get("timezone").is_some_and(|tz| !tz.is_empty())
                        && form.get("start").is_some_and(|s| s.ends_with("AM") || s.ends_with("PM"));
                    if ok { Redirect::to("/") } else { Redirect::to("/create_event") }
                })
                .get(|| async { "<form></form>" }),
            )
            .route("/", get(|| async { "dashboard" }))
    }

    fn submission(start: &str) -> EventSubmission {
        EventSubmission {
            name: "Mining Race".to_string(),
            description: "Most blocks wins".to_string(),
            event_json: "MiningRace.json".to_string(),
            timezone: "US/Eastern".to_string(),
            start: start.to_string(),
            end: "2030-06-01 02:00 PM".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_event_follows_redirect() {
        let client = serve(create_event_routes()).await;

        client.submit_event(&submission("2030-06-01 12:00 PM")).await.unwrap();
        assert!(matches!(
            client.submit_event(&submission("2030-06-01T12:00")).await,
            Err(ApiError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_schedule_event_validates_first() {
        let client = serve(create_event_routes()).await;
        let now = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();

        let mut form = FormSession::empty(vec!["US/Eastern".to_string(), "UTC".to_string()]);
        form.set_timezone("UTC");
        form.select_event_file("MiningRace.json");
        assert!(matches!(
            client.schedule_event(&form, now).await,
            Err(ApiError::Validation(ValidationError::MissingTimes))
        ));

        form.set_start(now + chrono::Duration::hours(1));
        form.set_end(now + chrono::Duration::hours(3));
        let sent = client.schedule_event(&form, now).await.unwrap();
        assert_eq!(sent.start, "2030-05-01 10:00 AM");
        assert_eq!(sent.end, "2030-05-01 12:00 PM");
        assert_eq!(sent.timezone, "UTC");
    }

    #[tokio::test]
    async fn test_schedule_event_now_rejects_past_start() {
        let client = serve(create_event_routes()).await;
        let now = chrono::Utc::now().naive_utc();

        let mut form = FormSession::empty(vec!["UTC".to_string()]);
        form.set_timezone("UTC");
        form.select_event_file("MiningRace.json");
        form.set_start(now - chrono::Duration::hours(2));
        form.set_end(now - chrono::Duration::hours(1));
        assert!(matches!(
            client.schedule_event_now(&form).await,
            Err(ApiError::Validation(ValidationError::StartInPast))
        ));

        form.set_start(now + chrono::Duration::days(1));
        form.set_end(now + chrono::Duration::days(1) + chrono::Duration::hours(2));
        let sent = client.schedule_event_now(&form).await.unwrap();
        assert_eq!(sent.name, "Mining Race");
    }

    fn read_only_routes() -> Router {
        Router::new()
            .route(
                "/api/database/info",
                get(|| async {
                    Json(json!({
                        "tables": ["event_winners", "events", "logs"],
                        "row_counts": {"event_winners": 2, "events": 5, "logs": 340},
                        "size_bytes": 524288,
                        "size_mb": 0.5
                    }))
                }),
            )
            .route(
                "/api/calendar",
                get(|| async {
                    Json(json!([{
                        "id": 5,
                        "unique_event_name": "Mining-Race-06-01-2030-1600",
                        "name": "Mining Race",
                        "event_json": "MiningRace.json",
                        "description": "Most blocks wins",
                        "start": "2030-06-01T16:00:00Z",
                        "end": "2030-06-01T18:00:00Z",
                        "event_in_progress": false,
                        "event_started": false,
                        "event_over": false,
                        "last_scoreboard_time": null,
                        "status": "future"
                    }]))
                }),
            )
            .route(
                "/api/winners",
                get(|| async {
                    Json(json!([{
                        "id": 1, "event_id": 4, "unique_event_name": "Fishing-05-01-2030-1600",
                        "event_name": "Fishing", "player_name": "steve", "final_score": 31,
                        "was_online": true, "rewarded_at": "2030-05-01 18:00:05", "reward_cmd": null
                    }]))
                }),
            )
            .route(
                "/api/logs",
                get(|| async {
                    Json(json!([
                        {"timestamp": "2030-05-01 18:00:05", "message": "Rewarded steve", "log_level": "INFO"},
                        {"timestamp": "2030-05-01 18:00:00", "message": "Event over", "log_level": "INFO"}
                    ]))
                }),
            )
            .route(
                "/api/log_content/{file}",
                get(|Path(file): Path<String>| async move {
                    if file == "handler_logs.txt" {
                        (StatusCode::OK, "2030-05-01 18:00:05: [INFO] Rewarded steve".to_string())
                    } else {
                        (StatusCode::NOT_FOUND, String::new())
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_read_only_views() {
        let client = serve(read_only_routes()).await;

        let info = client.database_info().await.unwrap();
        assert_eq!(info.tables, vec!["event_winners", "events", "logs"]);
        assert_eq!(info.row_count("logs"), Some(340));
        assert_eq!(info.size_bytes, Some(524288));

        let calendar = client.calendar().await.unwrap();
        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar[0].name, "Mining Race");
        assert_eq!(calendar[0].status, Some(eventdash_common::EventStatus::Future));

        let winners = client.winners().await.unwrap();
        assert_eq!(winners[0].player_name, "steve");
        assert_eq!(winners[0].final_score, Some(31));
        assert!(winners[0].was_online);
        assert!(winners[0].reward_cmd.is_none());

        let logs = client.logs().await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].to_string(), "2030-05-01 18:00:05: [INFO] Rewarded steve");

        let text = client.log_content("handler_logs.txt").await.unwrap();
        assert!(text.contains("Rewarded steve"));
        assert!(matches!(client.log_content("missing.txt").await, Err(ApiError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_overall_health_report() {
        let app = Router::new().route(
            "/api/health/overall",
            get(|| async {
                Json(json!({
                    "healthy": false,
                    "minecraft": {"healthy": true, "status": "online", "server_ip": "10.0.0.2"},
                    "rcon": {"healthy": false, "status": "error", "error": "RCON health check timed out", "player_count": 0},
                    "issues": ["RCON Connection"],
                    "status": "Issues: RCON Connection"
                }))
            }),
        );
        let client = serve(app).await;

        let report = client.overall_health().await.unwrap();
        assert!(!report.healthy);
        assert_eq!(report.issues, vec!["RCON Connection"]);
        assert_eq!(report.status, "Issues: RCON Connection");
        assert_eq!(report.rcon.unwrap().error(), Some("RCON health check timed out"));
        assert_eq!(report.minecraft.unwrap().server_ip(), Some("10.0.0.2"));
    }

    #[tokio::test]
    async fn test_overall_health_backend_failure() {
        let app = Router::new().route(
            "/api/health/overall",
            get(|| async { Json(json!({"healthy": false, "status": "error", "error": "rcon script missing"})) }),
        );
        let client = serve(app).await;

        match client.overall_health().await {
            Err(ApiError::Backend(message)) => assert_eq!(message, "rcon script missing"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetched_table_renders() {
        let app = Router::new().route(
            "/api/database/enhanced-table/{name}",
            get(|| async {
                Json(json!({
                    "table": "event_notifications",
                    "columns": ["id", "event_name", "notification_type", "sent_at"],
                    "rows": [
                        {"id": 2, "event_name": "Mining Race", "notification_type": "start", "sent_at": "2024-01-01T00:00:00Z"},
                        {"id": 1, "event_name": "Mining Race", "notification_type": "reminder", "sent_at": null}
                    ],
                    "total": 12,
                    "limit": 2,
                    "offset": 0
                }))
            }),
        );
        let client = serve(app).await;

        let table = client.fetch_table("event_notifications", Some(2)).await.unwrap();
        let grid = TablePresenter::default().render(&TableSpec::from_table_response(&table));

        assert_eq!(grid.columns, vec!["id", "event_name", "notification_type", "sent_at"]);
        assert_eq!(grid.cell(0, "sent_at").unwrap().display.text(), "1/1/2024, 12:00:00 AM");
        assert_eq!(grid.cell(1, "sent_at").unwrap().display.text(), "null");
        assert_eq!(grid.footer.to_string(), "Showing 2 of 12 total rows");
    }
}
