//! `/sys-logs/*`: administrator access to the request audit log.

use crate::{
    AppState,
    errors::AppError,
    handlers::extractors::{AdminUser, ValidJson, ValidQuery},
    models::sys_log::{BatchDeleteRequest, CleanupRequest, SysLog, SysLogQuery},
    response::{ApiResponse, PageData},
};
use axum::{Json, extract::State};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCount {
    pub deleted_count: u64,
}

/// `GET /sys-logs/list`
pub async fn list_logs(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidQuery(query): ValidQuery<SysLogQuery>,
) -> Result<Json<ApiResponse<PageData<SysLog>>>, AppError> {
    let page = state.sys_logs.get_logs(query).await?;
    Ok(Json(ApiResponse::ok(page, "Log list")))
}

/// `DELETE /sys-logs/batch` with `{"logIds": [..]}`
pub async fn batch_delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidJson(req): ValidJson<BatchDeleteRequest>,
) -> Result<Json<ApiResponse<DeletedCount>>, AppError> {
    let deleted_count = state.sys_logs.batch_delete(&req.log_ids).await?;
    tracing::info!(admin = admin.user_id, deleted_count, "batch log delete");
    Ok(Json(ApiResponse::ok(
        DeletedCount { deleted_count },
        format!("Deleted {} logs", deleted_count),
    )))
}

/// `POST /sys-logs/cleanup` with `{"startTime": .., "endTime": ..}`
pub async fn cleanup(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidJson(req): ValidJson<CleanupRequest>,
) -> Result<Json<ApiResponse<DeletedCount>>, AppError> {
    let deleted_count = state
        .sys_logs
        .cleanup(&req.start_time, &req.end_time)
        .await?;
    Ok(Json(ApiResponse::ok(
        DeletedCount { deleted_count },
        format!("Cleaned up {} logs", deleted_count),
    )))
}

/// `DELETE /sys-logs/clear-all`
pub async fn clear_all(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<ApiResponse<DeletedCount>>, AppError> {
    let deleted_count = state.sys_logs.clear_all().await?;
    tracing::warn!(admin = admin.user_id, deleted_count, "all logs cleared");
    Ok(Json(ApiResponse::ok(
        DeletedCount { deleted_count },
        format!("Cleared {} logs", deleted_count),
    )))
}
