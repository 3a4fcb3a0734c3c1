//! Turns tabular JSON from the backend into display-ready cells.

use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Value};

use eventdash_common::{QueryResponse, TableResponse};

use super::format::{
    format_timestamp, is_timestamp_column, parse_timestamp, plain_text, truncate, NULL_PLACEHOLDER,
};
use crate::config::TableConfig;
use crate::schedule::resolve_timezone;

pub const DEFAULT_TRUNCATE_AT: usize = 100;

/// Row layout, decided once per table from its first row
#[derive(Debug, Clone, PartialEq)]
pub enum RowShape {
    Named(Vec<Map<String, Value>>),
    Positional(Vec<Vec<Value>>),
}

impl RowShape {
    fn resolve(rows: &[Value]) -> Self {
        match rows.first() {
            Some(Value::Array(_)) => RowShape::Positional(
                rows.iter()
                    .map(|row| row.as_array().cloned().unwrap_or_default())
                    .collect(),
            ),
            _ => RowShape::Named(
                rows.iter()
                    .map(|row| row.as_object().cloned().unwrap_or_default())
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RowShape::Named(rows) => rows.len(),
            RowShape::Positional(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn synthetic_columns(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Column {}", i)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub columns: Vec<String>,
    pub rows: RowShape,
    /// Row count the backend reports for the whole table, if any
    pub total: Option<u64>,
}

impl TableSpec {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: RowShape::Named(Vec::new()),
            total: None,
        }
    }

    /// Build from `{columns, rows, total}`; anything malformed degrades to an empty table.
    pub fn from_json(value: &Value) -> Self {
        let Some(body) = value.as_object() else {
            return Self::empty();
        };
        let Some(rows) = body.get("rows").and_then(Value::as_array) else {
            return Self::empty();
        };
        let columns = body.get("columns").and_then(Value::as_array).map(|cols| {
            cols.iter()
                .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| plain_text(c)))
                .collect()
        });
        Self::build(columns, rows, body.get("total").and_then(Value::as_u64))
    }

    pub fn from_table_response(response: &TableResponse) -> Self {
        Self::build(response.columns.clone(), &response.rows, response.total)
    }

    /// Query results carry no column list; take it from the first row.
    pub fn from_query_response(response: &QueryResponse) -> Self {
        let columns = match response.results.first() {
            Some(Value::Object(first)) => first.keys().cloned().collect(),
            Some(Value::Array(first)) => synthetic_columns(first.len()),
            _ => Vec::new(),
        };
        Self::build(Some(columns), &response.results, response.count)
    }

    fn build(columns: Option<Vec<String>>, rows: &[Value], total: Option<u64>) -> Self {
        let rows = RowShape::resolve(rows);
        let columns = match (columns, &rows) {
            (Some(columns), _) => columns,
            (None, RowShape::Positional(positional)) => {
                synthetic_columns(positional.first().map_or(0, Vec::len))
            }
            (None, RowShape::Named(_)) => return Self::empty(),
        };
        Self { columns, rows, total }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum CellDisplay {
    Plain(String),
    Timestamp(String),
    Truncated(String),
    Null,
}

impl CellDisplay {
    pub fn text(&self) -> &str {
        match self {
            CellDisplay::Plain(s) | CellDisplay::Timestamp(s) | CellDisplay::Truncated(s) => s,
            CellDisplay::Null => NULL_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayCell {
    pub column: String,
    pub display: CellDisplay,
}

/// "Showing X of Y total rows"; informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableFooter {
    pub shown: usize,
    pub total: Option<u64>,
}

impl std::fmt::Display for TableFooter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.total.unwrap_or(self.shown as u64);
        write!(f, "Showing {} of {} total rows", self.shown, total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayGrid {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<DisplayCell>>,
    pub footer: TableFooter,
}

impl DisplayGrid {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&DisplayCell> {
        self.rows.get(row)?.iter().find(|cell| cell.column == column)
    }
}

#[derive(Debug, Clone)]
pub struct TablePresenter {
    display_tz: Tz,
    truncate_at: usize,
}

impl Default for TablePresenter {
    fn default() -> Self {
        Self::new(chrono_tz::UTC, DEFAULT_TRUNCATE_AT)
    }
}

impl TablePresenter {
    pub fn new(display_tz: Tz, truncate_at: usize) -> Self {
        Self { display_tz, truncate_at }
    }

    pub fn from_config(config: &TableConfig) -> Self {
        let display_tz = resolve_timezone(&config.display_timezone).unwrap_or_else(|e| {
            tracing::warn!("{}, displaying timestamps in UTC", e);
            chrono_tz::UTC
        });
        Self::new(display_tz, config.truncate_at)
    }

    pub fn render(&self, spec: &TableSpec) -> DisplayGrid {
        let rows: Vec<Vec<DisplayCell>> = match &spec.rows {
            RowShape::Named(rows) => rows
                .iter()
                .map(|row| {
                    spec.columns
                        .iter()
                        .map(|column| self.render_cell(column, row.get(column)))
                        .collect()
                })
                .collect(),
            RowShape::Positional(rows) => rows
                .iter()
                .map(|row| {
                    spec.columns
                        .iter()
                        .enumerate()
                        .map(|(i, column)| self.render_cell(column, row.get(i)))
                        .collect()
                })
                .collect(),
        };

        DisplayGrid {
            columns: spec.columns.clone(),
            footer: TableFooter {
                shown: rows.len(),
                total: spec.total,
            },
            rows,
        }
    }

    fn render_cell(&self, column: &str, value: Option<&Value>) -> DisplayCell {
        DisplayCell {
            column: column.to_string(),
            display: self.display_value(column, value.filter(|v| !v.is_null())),
        }
    }

    fn display_value(&self, column: &str, value: Option<&Value>) -> CellDisplay {
        let Some(value) = value else {
            return CellDisplay::Null;
        };

        if is_timestamp_column(column) {
            if let Some(t) = parse_timestamp(value) {
                return CellDisplay::Timestamp(format_timestamp(t, self.display_tz));
            }
        }

        match value {
            Value::String(s) => match truncate(s, self.truncate_at) {
                Some(short) => CellDisplay::Truncated(short),
                None => CellDisplay::Plain(s.clone()),
            },
            other => CellDisplay::Plain(plain_text(other)),
        }
    }
}
