//! Trino client protocol documents.
//!
//! Field names follow the Trino client JSON exactly; clients deserialize these
//! by name.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::core::types::{Column, ResultPage, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    pub id: String,
    pub info_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_cancel_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    pub stats: StatementStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryError>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_count: Option<i64>,
}

impl QueryResults {
    pub fn success(page: ResultPage, next_uri: Option<String>) -> Self {
        Self {
            next_uri,
            columns: Some(page.columns),
            data: Some(page.rows),
            ..Self::default()
        }
    }

    pub fn failure(message: String, status: StatusCode) -> Self {
        Self {
            error: Some(QueryError {
                message: Some(message),
                error_code: i32::from(status.as_u16()),
                ..QueryError::default()
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_state: Option<String>,
    pub error_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_location: Option<ErrorLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_info: Option<FailureInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocation {
    pub line_number: i32,
    pub column_number: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

/// A failure and, recursively, what caused or was suppressed by it. Each node
/// owns its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureInfo {
    #[serde(rename = "type")]
    pub failure_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<FailureInfo>>,
    #[serde(default)]
    pub suppressed: Vec<FailureInfo>,
    #[serde(default)]
    pub stack: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_location: Option<ErrorLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatementStats {
    pub state: String,
    pub queued: bool,
    pub scheduled: bool,
    pub progress_percentage: f64,
    pub running_percentage: f64,
    pub nodes: i64,
    pub total_splits: i64,
    pub queued_splits: i64,
    pub running_splits: i64,
    pub completed_splits: i64,
    pub cpu_time_millis: i64,
    pub wall_time_millis: i64,
    pub queued_time_millis: i64,
    pub elapsed_time_millis: i64,
    pub processed_rows: i64,
    pub processed_bytes: i64,
    pub physical_input_bytes: i64,
    pub physical_written_bytes: i64,
    pub peak_memory_bytes: i64,
    pub spilled_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_stage: Option<StageStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    pub state: String,
    pub done: bool,
    pub nodes: i64,
    pub total_splits: i64,
    pub queued_splits: i64,
    pub running_splits: i64,
    pub completed_splits: i64,
    pub cpu_time_millis: i64,
    pub wall_time_millis: i64,
    pub processed_rows: i64,
    pub processed_bytes: i64,
    pub physical_input_bytes: i64,
    pub failed_tasks: i64,
    pub coordinator_only: bool,
    pub sub_stages: Vec<StageStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub warning_code: WarningCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningCode {
    pub code: i32,
    pub name: String,
}
