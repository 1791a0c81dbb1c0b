//! `/users/*` handlers. Thin: extract, call `UserService`, wrap the result.

use crate::{
    AppState,
    errors::AppError,
    handlers::extractors::{AdminUser, CurrentUser, ValidJson, ValidPath, ValidQuery},
    models::user::{UserCreate, UserOut, UserUpdate},
    response::{ApiResponse, PageData},
};
use axum::{Json, extract::State};
use serde::Deserialize;

/// Paging query for `GET /users/list`.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    10
}

/// `POST /users/add`. Open registration of a normal user.
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<UserCreate>,
) -> Result<Json<ApiResponse<UserOut>>, AppError> {
    let user = state.users.create_user(input).await?;
    Ok(Json(ApiResponse::ok(user, "User created")))
}

/// `GET /users/list?page=&size=`
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidQuery(query): ValidQuery<ListUsersQuery>,
) -> Result<Json<ApiResponse<PageData<UserOut>>>, AppError> {
    let page = state.users.list_users(query.page, query.size).await?;
    Ok(Json(ApiResponse::ok(page, "User list")))
}

/// `GET /users/detail/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidPath(user_id): ValidPath<i64>,
) -> Result<Json<ApiResponse<UserOut>>, AppError> {
    let user = state.users.view_user(user_id, &actor).await?;
    Ok(Json(ApiResponse::ok(user, "User detail")))
}

/// `PUT /users/update/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidPath(user_id): ValidPath<i64>,
    ValidJson(input): ValidJson<UserUpdate>,
) -> Result<Json<ApiResponse<UserOut>>, AppError> {
    let user = state.users.update_user(user_id, input, &actor).await?;
    Ok(Json(ApiResponse::ok(user, "User updated")))
}

/// `DELETE /users/delete/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidPath(user_id): ValidPath<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.users.delete_user(user_id, &actor).await?;
    Ok(Json(ApiResponse::done("User deleted")))
}
