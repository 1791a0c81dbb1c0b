//! Audit middleware: records every non-excluded request in `sys_log`.
//!
//! Request and response bodies are buffered so they can be logged, then
//! handed on unchanged. The log row is written on a spawned task; a failed
//! write is logged and never reaches the client.

use crate::{
    AppState,
    errors::AppError,
    handlers::extractors::bearer_token,
    models::sys_log::{NewSysLog, STATUS_FAILURE, STATUS_SUCCESS},
    routes::route_info,
};
use axum::{
    body::{Body, to_bytes},
    extract::{ConnectInfo, MatchedPath, Query, Request, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::{collections::BTreeMap, net::SocketAddr, time::Instant};

/// Largest request body the middleware buffers.
const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;
const MAX_USER_AGENT_LEN: usize = 500;
const MASK: &str = "******";

pub async fn request_log(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let settings = &state.config.request_log;
    let path = req.uri().path();
    if settings
        .excluded_paths
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()))
    {
        return next.run(req).await;
    }

    let started = Instant::now();
    let request_time = Utc::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let client_ip = client_ip(&req);
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| truncate_chars(ua, MAX_USER_AGENT_LEN));
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .and_then(|matched| route_info(&method, matched.as_str()));
    let user_info = user_info(&state, req.headers());

    let (parts, body) = req.into_parts();
    let body = match to_bytes(body, MAX_REQUEST_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("request body rejected by request log: {}", err);
            return AppError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
                .into_response();
        }
    };
    let request_params = request_params(&method, &uri, &body);
    let response = next
        .run(Request::from_parts(parts, Body::from(body)))
        .await;

    let (parts, body) = response.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("failed to buffer response body: {}", err);
            return AppError::internal(format!("response body: {}", err)).into_response();
        }
    };

    let entry = NewSysLog {
        request_url: uri.to_string(),
        request_method: method.to_string(),
        request_params: Some(request_params),
        visit_module: route.map(|r| r.module.to_string()),
        operation_type: route.map(|r| r.summary.to_string()),
        operation_status: operation_status(parts.status, &body).to_string(),
        response_result: Some(truncate_chars(
            &String::from_utf8_lossy(&body),
            settings.max_body_length,
        )),
        request_time,
        duration: Some(started.elapsed().as_millis() as i64),
        user_info,
        client_ip,
        user_agent,
    };

    let sys_logs = state.sys_logs.clone();
    tokio::spawn(async move {
        if let Err(err) = sys_logs.record(entry).await {
            tracing::error!("failed to persist request log: {}", err);
        }
    });

    Response::from_parts(parts, Body::from(body))
}

/// Peer address of the connection, else the first `X-Forwarded-For` hop.
fn client_ip(req: &Request) -> Option<String> {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip().to_string());
    }
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// The caller's id as JSON when the bearer token decodes.
fn user_info(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let token = bearer_token(headers)?;
    let claims = state.auth.tokens().decode_token(token).ok()?;
    let user_id = claims.user_id()?;
    Some(json!({ "userId": user_id }).to_string())
}

/// Query parameters for bodiless methods, the JSON body otherwise. A body
/// that is not JSON is recorded as `{}`. Credentials are masked.
fn request_params(method: &Method, uri: &Uri, body: &Bytes) -> String {
    let has_body_method = matches!(*method, Method::POST | Method::PUT | Method::PATCH);
    let mut value = if has_body_method || (*method == Method::DELETE && !body.is_empty()) {
        if body.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Map::new()))
        }
    } else {
        let Query(params) = Query::<BTreeMap<String, String>>::try_from_uri(uri)
            .unwrap_or_else(|_| Query(BTreeMap::new()));
        json!(params)
    };
    mask_secrets(&mut value);
    value.to_string()
}

fn mask_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                let key = key.to_ascii_lowercase();
                if key.contains("password") || key.contains("token") {
                    *field = Value::String(MASK.to_string());
                } else {
                    mask_secrets(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}

/// `failure` for HTTP errors and for envelopes with `success: false`.
fn operation_status(status: StatusCode, body: &[u8]) -> &'static str {
    if status.as_u16() >= 400 {
        return STATUS_FAILURE;
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if map.get("success") == Some(&Value::Bool(false)) => {
            STATUS_FAILURE
        }
        _ => STATUS_SUCCESS,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
