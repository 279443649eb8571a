// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP gateway tests: envelopes, health, CORS and security headers.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;

mod common;
use common::{empty_request, json_request, send};

#[tokio::test]
async fn test_health_is_not_enveloped() {
    let (app, _) = common::create_test_app();
    let (status, body, _) = send(&app, empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body.get("build_id").is_some());
    assert!(body.get("successCode").is_none());
}

#[tokio::test]
async fn test_malformed_json_is_invalid_argument() {
    let (app, _) = common::create_test_app();
    let (status, body, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/register-user")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["successCode"], 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "invalid_argument");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_validation_errors_name_fields() {
    let (app, _) = common::create_test_app();
    let (status, body, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/register-user",
            None,
            json!({ "username": "ab", "email": "nope", "password": "short" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("email"), "{message}");
    assert!(message.contains("password"), "{message}");
    assert!(message.contains("username"), "{message}");
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let (app, _) = common::create_test_app();
    let (_, _, response) = send(&app, empty_request("GET", "/api/v1/categories", None)).await;

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("strict-transport-security"));
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("referrer-policy"));
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let (app, state) = common::create_test_app();
    let origin = state.config.cors_origin.clone();

    let (status, _, response) = send(
        &app,
        Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/posts")
            .header(header::ORIGIN, &origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(status.is_success());

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], origin.as_str());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(methods.contains("PATCH"));
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let (app, _) = common::create_test_app();
    let (_, _, response) = send(
        &app,
        Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/posts")
            .header(header::ORIGIN, "https://evil.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_category_crud_round() {
    let (app, _) = common::create_test_app();
    let token = common::login_token(&app, "admin").await;
    let id = common::create_category(&app, &token, "News").await;

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/categories",
            Some(&token),
            json!({ "name": "news" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/v1/categories/{id}"),
            Some(&token),
            json!({ "description": "Announcements" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "News");
    assert_eq!(body["data"]["description"], "Announcements");

    // Posts keep working after their category goes away
    let post = common::create_post(&app, &token, "Launch", Some("News")).await;
    let (status, _, _) = send(
        &app,
        empty_request("DELETE", &format!("/api/v1/categories/{id}"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = send(
        &app,
        empty_request(
            "GET",
            &format!("/api/v1/posts/{}", post["id"].as_str().unwrap()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["categories"], json!([]));

    let (status, _, _) = send(
        &app,
        empty_request("GET", &format!("/api/v1/categories/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
