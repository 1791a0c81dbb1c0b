// Common test utilities for integration tests

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use std::{collections::HashMap, time::Duration};
use tower::ServiceExt;
use user_service::{AppState, config::AppConfig, db, routes::build_app};

pub const PASSWORD: &str = "Str0ng!Pass";
pub const ADMIN_NAME: &str = "root";

/// A router over a fresh in-memory database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Config as a test environment would load it, plus `overrides`.
pub fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = [
        ("APP_ENV", "dev"),
        ("APP_NAME", "User Service Test"),
        ("DB_URL", "sqlite::memory:"),
        ("SECRET_KEY", "test-secret-key-minimum-32-characters-long"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config(&[])).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let pool = db::connect(&config.database_url)
            .await
            .expect("Failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let state = AppState::new(config, pool);
        Self {
            router: build_app(state.clone()),
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register a normal user through the API and return its id.
    pub async fn register(&self, user_name: &str) -> i64 {
        let res = self
            .post(
                "/users/add",
                None,
                serde_json::json!({
                    "userName": user_name,
                    "password": PASSWORD,
                    "email": format!("{}@example.com", user_name),
                }),
            )
            .await;
        assert_eq!(res.body["success"], true, "register {}: {}", user_name, res.body);
        res.body["data"]["userId"].as_i64().unwrap()
    }

    /// Bootstrap the administrator account and return its id.
    pub async fn create_admin(&self) -> i64 {
        let (user, _) = self
            .state
            .users
            .ensure_admin(ADMIN_NAME, PASSWORD)
            .await
            .expect("Failed to create admin");
        user.user_id
    }

    /// Log in and return the full token payload.
    pub async fn login_tokens(&self, user_name: &str) -> Value {
        let res = self
            .post(
                "/auth/login",
                None,
                serde_json::json!({ "username": user_name, "password": PASSWORD }),
            )
            .await;
        assert_eq!(res.body["success"], true, "login {}: {}", user_name, res.body);
        res.body["data"].clone()
    }

    pub async fn login(&self, user_name: &str) -> String {
        self.login_tokens(user_name).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Request logs are written on a spawned task; poll until `count`
    /// entries match `query` or give up.
    pub async fn wait_for_logs(&self, admin_token: &str, query: &str, count: i64) -> Value {
        let uri = format!("/sys-logs/list?{}", query);
        let mut last = Value::Null;
        for _ in 0..50 {
            let res = self.get(&uri, Some(admin_token)).await;
            if res.body["data"]["total"].as_i64().unwrap_or(0) >= count {
                return res.body["data"].clone();
            }
            last = res.body;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} logs for `{}`, last response: {}", count, query, last);
    }
}
