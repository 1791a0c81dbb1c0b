//! `/auth/*`: login, token refresh, current user, logout.

use crate::{
    AppState,
    errors::AppError,
    handlers::extractors::{CurrentUser, ValidJson},
    models::user::UserOut,
    response::ApiResponse,
    services::auth_service::TokenResponse,
};
use axum::{Json, extract::State};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let tokens = state.auth.login(&req.username, &req.password).await?;
    Ok(Json(ApiResponse::ok(tokens, "Login successful")))
}

/// `POST /auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let tokens = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::ok(tokens, "Token refreshed")))
}

/// `GET /auth/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<UserOut>> {
    Json(ApiResponse::ok(user.into(), "Current user"))
}

/// `POST /auth/logout`. Revokes every token of the caller.
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<()>> {
    state.auth.logout(&user).await;
    Json(ApiResponse::done("Logged out"))
}
