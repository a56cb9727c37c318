use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use playroom::api;
use playroom::config::{AppConfig, LimitConfig, ThrottleConfig};
use playroom::state::AppState;
use playroom::throttle::RequestThrottle;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    api::router(Arc::new(AppState::default()), None)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

#[tokio::test]
async fn test_index_lists_versions() {
    let (status, body) = send(&app(), Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["versions"], json!(["v3"]));
}

#[tokio::test]
async fn test_game_over_http() {
    let app = app();

    let (_, body) = post(
        &app,
        "/v3/tic_tac_toe",
        json!({ "method": "fetch", "username": "Alice", "game": "G1" }),
    )
    .await;
    assert_eq!(body["status"], "waiting");
    assert_eq!(body["players"], json!(["alice"]));

    let (status, body) = post(
        &app,
        "/v3/tic_tac_toe",
        json!({ "method": "play", "username": "alice", "move": "2-2", "session": "SA", "game": "G1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Move sent successfully" }));

    // Domain errors still answer 200 with an error body
    let (status, body) = post(
        &app,
        "/v3/tic_tac_toe",
        json!({ "method": "play", "username": "bob", "move": "2-2", "session": "SB", "game": "G1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "CELL_TAKEN");
    assert_eq!(
        body["error"],
        "Move already made. Please choose a different move."
    );
    assert_eq!(body["documentation"], "https://docs.sylvain.pro");

    let (_, body) = post(
        &app,
        "/v3/tic_tac_toe",
        json!({ "method": "play", "username": "bob", "move": "4-1", "session": "SB", "game": "G1" }),
    )
    .await;
    assert_eq!(body["code"], "INVALID_MOVE");

    let (_, body) = post(
        &app,
        "/v3/tic_tac_toe",
        json!({ "method": "fetch", "username": "bob", "game": "G1" }),
    )
    .await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["turn"], "bob");
    assert_eq!(body["moves"], json!([{ "username": "alice", "move": "2-2" }]));
    assert_eq!(body["tie"], false);
}

#[tokio::test]
async fn test_fetch_without_game_returns_new_id() {
    let (_, body) = post(
        &app(),
        "/v3/tic_tac_toe",
        json!({ "method": "fetch", "username": "alice" }),
    )
    .await;
    let id = body["id"].as_str().unwrap();
    assert_eq!(id.len(), 5);
    assert!(body.get("tie").is_none());
}

#[tokio::test]
async fn test_chat_over_http() {
    let app = app();

    let (_, body) = post(&app, "/v3/chat", json!({ "method": "fetch", "username": "bob" })).await;
    assert_eq!(body["error"], "No messages stored.");

    let (_, body) = post(
        &app,
        "/v3/chat",
        json!({ "method": "message", "username": "alice", "message": "hi all", "session": "SA" }),
    )
    .await;
    assert_eq!(body, json!({ "message": "Message sent successfully" }));

    let (_, body) = post(&app, "/v3/chat", json!({ "method": "fetch", "username": "bob" })).await;
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["username"], "alice");
    assert_eq!(messages[0]["message"], "hi all");
    assert!(messages[0]["timestamp"].is_string());

    let (_, body) = post(
        &app,
        "/v3/chat",
        json!({ "method": "private", "username": "bob", "token": "nope" }),
    )
    .await;
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_unknown_method_is_invalid_action() {
    let (_, body) = post(
        &app(),
        "/v3/chat",
        json!({ "method": "delete", "username": "alice" }),
    )
    .await;
    assert_eq!(body["code"], "INVALID_ACTION");
}

#[tokio::test]
async fn test_get_is_rejected() {
    let (status, body) = send(&app(), Method::GET, "/v3/chat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "This endpoint only supports POST requests.");
}

#[tokio::test]
async fn test_unknown_routes_are_404() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/v9/chat", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid API version (v9).");

    let (status, body) = send(&app, Method::GET, "/v3/qrcode", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint 'qrcode' does not exists in v3.");
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v3/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_rate_limit_maps_to_429() {
    let config = AppConfig {
        limits: LimitConfig {
            max_requests: 1,
            ..LimitConfig::default()
        },
        ..AppConfig::default()
    };
    let app = api::router(Arc::new(AppState::new(&config)), None);
    let body = json!({ "method": "fetch", "username": "alice", "game": "G" });

    let (status, _) = post(&app, "/v3/tic_tac_toe", body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/v3/tic_tac_toe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn test_global_throttle() {
    let throttle = RequestThrottle::new(&ThrottleConfig {
        max_requests: 2,
        window: Duration::from_secs(60),
    });
    let app = api::router(Arc::new(AppState::default()), Some(throttle));

    assert_eq!(send(&app, Method::GET, "/", None).await.0, StatusCode::OK);
    assert_eq!(send(&app, Method::GET, "/", None).await.0, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Too Many Requests");
}
