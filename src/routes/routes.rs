//! Defines all HTTP routes of the user management API.
//!
//! ## Structure
//! - **System**: `GET /`, `GET /health`
//! - **Auth**: `POST /auth/login`, `POST /auth/refresh`, `GET /auth/me`,
//!   `POST /auth/logout`
//! - **Users**: `POST /users/add`, `GET /users/list`, `GET /users/detail/{id}`,
//!   `PUT /users/update/{id}`, `DELETE /users/delete/{id}`
//! - **Logs**: `GET /sys-logs/list`, `DELETE /sys-logs/batch`,
//!   `POST /sys-logs/cleanup`, `DELETE /sys-logs/clear-all`
//!
//! Every route also has an entry in `ROUTE_TABLE`, which the request log uses
//! to name the module and operation of a request.

use crate::{
    AppState,
    config::AppConfig,
    handlers::{auth_handlers, health_handlers, sys_log_handlers, user_handlers},
    middleware::request_log::request_log,
};
use axum::{
    Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Method, Request},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info_span};

/// Audit metadata of one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub module: &'static str,
    pub summary: &'static str,
}

const fn info(
    method: &'static str,
    path: &'static str,
    module: &'static str,
    summary: &'static str,
) -> RouteInfo {
    RouteInfo {
        method,
        path,
        module,
        summary,
    }
}

pub const ROUTE_TABLE: &[RouteInfo] = &[
    info("GET", "/", "system", "Welcome"),
    info("GET", "/health", "system", "Health check"),
    info("POST", "/auth/login", "auth", "Login"),
    info("POST", "/auth/refresh", "auth", "Refresh token"),
    info("GET", "/auth/me", "auth", "Current user"),
    info("POST", "/auth/logout", "auth", "Logout"),
    info("POST", "/users/add", "users", "Create user"),
    info("GET", "/users/list", "users", "List users"),
    info("GET", "/users/detail/{id}", "users", "User detail"),
    info("PUT", "/users/update/{id}", "users", "Update user"),
    info("DELETE", "/users/delete/{id}", "users", "Delete user"),
    info("GET", "/sys-logs/list", "sys-logs", "List logs"),
    info("DELETE", "/sys-logs/batch", "sys-logs", "Batch delete logs"),
    info("POST", "/sys-logs/cleanup", "sys-logs", "Clean up logs by time range"),
    info("DELETE", "/sys-logs/clear-all", "sys-logs", "Clear all logs"),
];

/// Look up the audit metadata for a matched route pattern.
pub fn route_info(method: &Method, matched_path: &str) -> Option<&'static RouteInfo> {
    ROUTE_TABLE
        .iter()
        .find(|r| r.path == matched_path && r.method == method.as_str())
}

/// Route definitions, without state or layers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health_handlers::root))
        .route("/health", get(health_handlers::health))
        // auth
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/refresh", post(auth_handlers::refresh))
        .route("/auth/me", get(auth_handlers::me))
        .route("/auth/logout", post(auth_handlers::logout))
        // users
        .route("/users/add", post(user_handlers::create_user))
        .route("/users/list", get(user_handlers::list_users))
        .route("/users/detail/{id}", get(user_handlers::get_user))
        .route("/users/update/{id}", put(user_handlers::update_user))
        .route("/users/delete/{id}", delete(user_handlers::delete_user))
        // audit log
        .route("/sys-logs/list", get(sys_log_handlers::list_logs))
        .route("/sys-logs/batch", delete(sys_log_handlers::batch_delete))
        .route("/sys-logs/cleanup", post(sys_log_handlers::cleanup))
        .route("/sys-logs/clear-all", delete(sys_log_handlers::clear_all))
}

/// Build the complete application: routes, request log, tracing, CORS.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    routes()
        .layer(from_fn_with_state(state.clone(), request_log))
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    if cfg.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = cfg
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("ignoring invalid CORS origin `{}`: {}", origin, err);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn make_span(request: &Request<Body>) -> Span {
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
    )
}
