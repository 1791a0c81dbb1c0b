mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::{TestApp, test_config};
use serde_json::json;

#[tokio::test]
async fn requests_are_recorded_with_route_metadata() {
    let app = TestApp::new().await;
    app.create_admin().await;
    app.register("alice").await;
    let admin = app.login("root").await;

    let page = app
        .wait_for_logs(&admin, "requestUrl=/users/add&visitModule=users", 1)
        .await;
    let log = &page["records"][0];
    assert_eq!(log["requestMethod"], "POST");
    assert_eq!(log["visitModule"], "users");
    assert_eq!(log["operationType"], "Create user");
    assert_eq!(log["operationStatus"], "success");
    let params: serde_json::Value =
        serde_json::from_str(log["requestParams"].as_str().unwrap()).unwrap();
    assert_eq!(params["userName"], "alice");
    assert_eq!(params["password"], "******");

    // Failed logins are logged as failures even though HTTP says 200.
    app.post(
        "/auth/login",
        None,
        json!({ "username": "alice", "password": "Wr0ng!Pass1" }),
    )
    .await;
    let page = app
        .wait_for_logs(&admin, "requestUrl=/auth/login&operationStatus=failure", 1)
        .await;
    assert_eq!(page["records"][0]["visitModule"], "auth");
}

#[tokio::test]
async fn excluded_paths_are_not_recorded() {
    let app = TestApp::new().await;
    app.create_admin().await;
    let admin = app.login("root").await;

    app.get("/health", None).await;
    app.get("/", None).await;

    // `/` and `/health` share the "system" module; only `/` is recorded.
    let page = app.wait_for_logs(&admin, "visitModule=system", 1).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["records"][0]["requestUrl"], "/");
}

#[tokio::test]
async fn log_endpoints_are_admin_only() {
    let app = TestApp::new().await;
    app.register("alice").await;
    let alice = app.login("alice").await;

    assert_eq!(
        app.get("/sys-logs/list", Some(&alice)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.request(Method::DELETE, "/sys-logs/clear-all", Some(&alice), None)
            .await
            .status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn batch_delete_cleanup_and_clear() {
    let app = TestApp::new().await;
    app.create_admin().await;
    app.register("alice").await;
    let admin = app.login("root").await;

    let page = app
        .wait_for_logs(&admin, "requestUrl=/users/add&visitModule=users", 1)
        .await;
    let id = page["records"][0]["id"].as_i64().unwrap();

    let res = app
        .request(
            Method::DELETE,
            "/sys-logs/batch",
            Some(&admin),
            Some(json!({ "logIds": [] })),
        )
        .await;
    assert_eq!(res.body["success"], false);

    let res = app
        .request(
            Method::DELETE,
            "/sys-logs/batch",
            Some(&admin),
            Some(json!({ "logIds": [id] })),
        )
        .await;
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["deletedCount"], 1);

    let res = app
        .post(
            "/sys-logs/cleanup",
            Some(&admin),
            json!({ "startTime": "2030-01-02 00:00:00", "endTime": "2030-01-01 00:00:00" }),
        )
        .await;
    assert_eq!(res.body["success"], false);

    let res = app
        .post(
            "/sys-logs/cleanup",
            Some(&admin),
            json!({ "startTime": "2000-01-01 00:00:00", "endTime": "2000-01-02 00:00:00" }),
        )
        .await;
    assert_eq!(res.body["success"], false);

    let res = app
        .request(Method::DELETE, "/sys-logs/clear-all", Some(&admin), None)
        .await;
    assert_eq!(res.body["success"], true);
}

#[tokio::test]
async fn response_body_is_truncated_to_configured_length() {
    let app = TestApp::with_config(test_config(&[("LOG_MAX_BODY_LENGTH", "20")])).await;
    app.create_admin().await;
    app.register("alice").await;
    let admin = app.login("root").await;

    let page = app
        .wait_for_logs(&admin, "requestUrl=/users/add&visitModule=users", 1)
        .await;
    let result = page["records"][0]["responseResult"].as_str().unwrap();
    assert_eq!(result.chars().count(), 20);
}

#[tokio::test]
async fn caller_details_are_captured() {
    let app = TestApp::new().await;
    let admin_id = app.create_admin().await;
    let admin = app.login("root").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/users/list?page=1&size=5")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .header(header::USER_AGENT, "a".repeat(600))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status, StatusCode::OK);

    let page = app
        .wait_for_logs(&admin, "visitModule=users&requestMethod=GET", 1)
        .await;
    let log = &page["records"][0];
    assert_eq!(log["requestUrl"], "/users/list?page=1&size=5");
    assert_eq!(log["clientIp"], "203.0.113.7");
    assert_eq!(log["userAgent"].as_str().unwrap().chars().count(), 500);

    let params: serde_json::Value =
        serde_json::from_str(log["requestParams"].as_str().unwrap()).unwrap();
    assert_eq!(params, json!({ "page": "1", "size": "5" }));

    let user_info: serde_json::Value =
        serde_json::from_str(log["userInfo"].as_str().unwrap()).unwrap();
    assert_eq!(user_info, json!({ "userId": admin_id }));
}

#[tokio::test]
async fn delete_without_body_records_query_params() {
    let app = TestApp::new().await;
    app.create_admin().await;
    let admin = app.login("root").await;
    let alice = app.register("alice").await;

    let uri = format!("/users/delete/{}?reason=cleanup", alice);
    let res = app.request(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(res.body["success"], true);

    let page = app
        .wait_for_logs(&admin, "visitModule=users&requestMethod=DELETE", 1)
        .await;
    let log = &page["records"][0];
    assert_eq!(log["operationType"], "Delete user");
    assert_eq!(log["requestParams"], r#"{"reason":"cleanup"}"#);
    assert!(log["clientIp"].is_null());
}

#[tokio::test]
async fn log_page_past_the_end_is_empty() {
    let app = TestApp::new().await;
    app.create_admin().await;
    let admin = app.login("root").await;

    let uri = format!("/sys-logs/list?page={}&size=100", i64::MAX);
    let res = app.get(&uri, Some(&admin)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["records"], json!([]));
}
