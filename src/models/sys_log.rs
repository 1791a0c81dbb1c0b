//! Represents one audited HTTP request in `sys_log`.

use super::datetime_format;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILURE: &str = "failure";

/// A stored request log entry.
#[derive(Serialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SysLog {
    pub id: i64,

    /// Full request URL (path and query).
    pub request_url: String,

    /// GET / POST / PUT / DELETE ...
    pub request_method: String,

    /// Query or JSON body as a JSON string.
    pub request_params: Option<String>,

    /// Module of the matched route (e.g. "users").
    pub visit_module: Option<String>,

    /// Operation summary of the matched route.
    pub operation_type: Option<String>,

    /// `success` or `failure`.
    pub operation_status: String,

    /// Response body, truncated.
    pub response_result: Option<String>,

    #[serde(with = "datetime_format")]
    pub request_time: DateTime<Utc>,

    /// Milliseconds.
    pub duration: Option<i64>,

    /// JSON describing the caller, when the bearer token decodes.
    pub user_info: Option<String>,

    pub client_ip: Option<String>,

    pub user_agent: Option<String>,

    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// Values captured by the request log middleware.
#[derive(Debug, Clone)]
pub struct NewSysLog {
    pub request_url: String,
    pub request_method: String,
    pub request_params: Option<String>,
    pub visit_module: Option<String>,
    pub operation_type: Option<String>,
    pub operation_status: String,
    pub response_result: Option<String>,
    pub request_time: DateTime<Utc>,
    pub duration: Option<i64>,
    pub user_info: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Optional filters for listing logs.
#[derive(Debug, Clone, Default)]
pub struct SysLogFilter {
    /// Substring match.
    pub request_url: Option<String>,
    pub request_method: Option<String>,
    pub visit_module: Option<String>,
    pub operation_status: Option<String>,
    pub client_ip: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Query string of `GET /sys-logs/list`. Times are still raw text here.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SysLogQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub request_url: Option<String>,
    pub request_method: Option<String>,
    pub visit_module: Option<String>,
    pub operation_status: Option<String>,
    pub client_ip: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteRequest {
    pub log_ids: Vec<i64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    pub start_time: String,
    pub end_time: String,
}
