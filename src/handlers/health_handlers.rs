//! Root and health endpoints.
//!
//! - GET /        -> welcome message
//! - GET /health  -> checks DB connectivity, 200 healthy / 503 unhealthy

use crate::{AppState, db, models::datetime_format, response::ApiResponse};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    pub app_name: String,
    pub app_version: &'static str,
    pub environment: &'static str,
}

/// `GET /`
pub async fn root(State(state): State<AppState>) -> Json<ApiResponse<Welcome>> {
    let cfg = &state.config;
    Json(ApiResponse::ok(
        Welcome {
            app_name: cfg.app_name.clone(),
            app_version: APP_VERSION,
            environment: cfg.app_env.as_str(),
        },
        format!("Welcome to {}", cfg.app_name),
    ))
}

/// `GET /health`
///
/// Runs `SELECT 1` against the pool. HTTP 200 when the database answers,
/// HTTP 503 otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (healthy, database) = match db::ping(&state.db).await {
        Ok(()) => (true, "connected".to_string()),
        Err(err) => {
            tracing::warn!("health check: database unreachable: {}", err);
            (false, format!("disconnected: {}", err))
        }
    };

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: Utc::now().format(datetime_format::FORMAT).to_string(),
        app_name: state.config.app_name.clone(),
        app_version: APP_VERSION,
        environment: state.config.app_env.as_str(),
        checks: HealthChecks {
            database,
            app: "running",
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    app_name: String,
    app_version: &'static str,
    environment: &'static str,
    checks: HealthChecks,
}

#[derive(Serialize)]
struct HealthChecks {
    database: String,
    app: &'static str,
}
