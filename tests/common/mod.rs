// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use forum_api::config::Config;
use forum_api::db::{FirestoreDb, MemoryDb};
use forum_api::routes::create_router;
use forum_api::services::LogMailer;
use forum_api::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app on a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        Arc::new(MemoryDb::new()),
        Arc::new(LogMailer),
    ));
    (create_router(state.clone()), state)
}

/// Send one request and decode the JSON body (`Value::Null` when empty).
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value, Response<Body>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json, Response::from_parts(parts, Body::empty()))
}

/// JSON request, optionally authenticated with a bearer token.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Bodiless request, optionally authenticated with a bearer token.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// All `Set-Cookie` header values of a response.
#[allow(dead_code)]
pub fn set_cookie_headers<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Register and log in `username`; returns the login response data.
#[allow(dead_code)]
pub async fn register_and_login(app: &Router, username: &str) -> Value {
    let (status, _, _) = send(
        app,
        json_request(
            "POST",
            "/api/v1/users/register-user",
            None,
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "correct horse battery",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body, _) = send(
        app,
        json_request(
            "POST",
            "/api/v1/users/login-user",
            None,
            json!({ "username": username, "password": "correct horse battery" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"].clone()
}

/// Access token for a freshly registered user.
#[allow(dead_code)]
pub async fn login_token(app: &Router, username: &str) -> String {
    register_and_login(app, username).await["accessToken"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Create a category and return its ID.
#[allow(dead_code)]
pub async fn create_category(app: &Router, token: &str, name: &str) -> String {
    let (status, body, _) = send(
        app,
        json_request(
            "POST",
            "/api/v1/categories",
            Some(token),
            json!({ "name": name }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

/// Create a post and return its view.
#[allow(dead_code)]
pub async fn create_post(app: &Router, token: &str, title: &str, category: Option<&str>) -> Value {
    let mut payload = json!({ "title": title, "content": format!("{title} body") });
    if let Some(category) = category {
        payload["category"] = json!(category);
    }
    let (status, body, _) = send(
        app,
        json_request("POST", "/api/v1/posts", Some(token), payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}
