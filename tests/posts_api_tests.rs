// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post API tests: creation, pagination, voting and cascades.

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;

mod common;
use common::{empty_request, json_request, send};

#[tokio::test]
async fn test_create_then_get_post() {
    let (app, _) = common::create_test_app();
    let token = common::login_token(&app, "poster").await;
    let category_id = common::create_category(&app, &token, "general").await;

    let created = common::create_post(&app, &token, "T", Some("general")).await;
    let post_id = created["id"].as_str().unwrap();

    let (status, body, _) = send(
        &app,
        empty_request("GET", &format!("/api/v1/posts/{post_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let post = &body["data"];
    assert_eq!(post["title"], "T");
    assert_eq!(post["content"], "T body");
    assert_eq!(post["totalComments"], 0);
    assert_eq!(post["upvotes"], 0);
    assert_eq!(post["categories"][0]["id"], category_id.as_str());
    assert_eq!(post["categories"][0]["name"], "general");
}

#[tokio::test]
async fn test_create_post_requires_auth() {
    let (app, _) = common::create_test_app();
    let (status, body, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/posts",
            None,
            json!({ "title": "T", "content": "C" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_create_post_with_unknown_category_not_found() {
    let (app, _) = common::create_test_app();
    let token = common::login_token(&app, "poster").await;
    let (status, body, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/posts",
            Some(&token),
            json!({ "title": "T", "content": "C", "category": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_pagination_twelve_posts_by_five() {
    let (app, _) = common::create_test_app();
    let token = common::login_token(&app, "poster").await;
    for i in 0..12 {
        common::create_post(&app, &token, &format!("Post {i}"), None).await;
    }

    let (status, body, _) = send(
        &app,
        empty_request("GET", "/api/v1/posts?page=1&limit=5", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["items"].as_array().unwrap().len(), 5);
    assert_eq!(page["totalItems"], 12);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(
        page["nextPage"],
        "http://localhost:8080/api/v1/posts?page=2&limit=5"
    );
    assert!(page["prevPage"].is_null());
    // Newest first
    assert_eq!(page["items"][0]["title"], "Post 11");

    let (status, body, _) = send(
        &app,
        empty_request("GET", "/api/v1/posts?page=3&limit=5", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert!(page["nextPage"].is_null());
    assert_eq!(
        page["prevPage"],
        "http://localhost:8080/api/v1/posts?page=2&limit=5"
    );
}

#[tokio::test]
async fn test_pagination_rejects_bad_parameters() {
    let (app, _) = common::create_test_app();
    let token = common::login_token(&app, "poster").await;
    common::create_post(&app, &token, "Only", None).await;

    for uri in [
        "/api/v1/posts?page=0",
        "/api/v1/posts?limit=0",
        "/api/v1/posts?limit=101",
        "/api/v1/posts?page=abc",
    ] {
        let (status, body, _) = send(&app, empty_request("GET", uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "invalid_argument");
    }

    let (status, _, _) = send(&app, empty_request("GET", "/api/v1/posts?page=5", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_title_query_and_category_filter() {
    let (app, _) = common::create_test_app();
    let token = common::login_token(&app, "poster").await;
    common::create_category(&app, &token, "Rust").await;
    common::create_post(&app, &token, "Borrow checker tips", Some("Rust")).await;
    common::create_post(&app, &token, "Garden notes", None).await;

    let (_, body, _) = send(
        &app,
        empty_request("GET", "/api/v1/posts?query=BORROW", None),
    )
    .await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Borrow checker tips");

    let (status, body, _) = send(
        &app,
        empty_request("GET", "/api/v1/posts/category/rust", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (status, _, _) = send(
        &app,
        empty_request("GET", "/api/v1/posts/category/unknown", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_post_id_is_bad_request() {
    let (app, _) = common::create_test_app();
    let (status, body, _) = send(
        &app,
        empty_request("GET", "/api/v1/posts/not-an-id", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");

    let missing = uuid::Uuid::now_v7();
    let (status, _, _) = send(
        &app,
        empty_request("GET", &format!("/api/v1/posts/{missing}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_upvotes_are_not_lost() {
    let (app, state) = common::create_test_app();
    let token = common::login_token(&app, "voter").await;
    let post = common::create_post(&app, &token, "Popular", None).await;
    let post_id = post["id"].as_str().unwrap().to_string();
    let token = Arc::new(token);

    let mut handles = Vec::new();
    for _ in 0..50 {
        let app = app.clone();
        let token = token.clone();
        let uri = format!("/api/v1/posts/{post_id}/upvote");
        handles.push(tokio::spawn(async move {
            let (status, _, _) = send(&app, empty_request("PATCH", &uri, Some(&token))).await;
            status
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let stored = state.db.get_post(&post_id).await.unwrap().unwrap();
    assert_eq!(stored.upvotes, 50);
    assert_eq!(stored.downvotes, 0);
}

#[tokio::test]
async fn test_partial_update_and_delete_cascade() {
    let (app, state) = common::create_test_app();
    let token = common::login_token(&app, "editor").await;
    let post = common::create_post(&app, &token, "Draft", None).await;
    let post_id = post["id"].as_str().unwrap().to_string();

    let (status, body, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/v1/posts/{post_id}"),
            Some(&token),
            json!({ "title": "Final" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Final");
    assert_eq!(body["data"]["content"], "Draft body");

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/comments/{post_id}"),
            Some(&token),
            json!({ "content": "first" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = send(
        &app,
        empty_request("DELETE", &format!("/api/v1/posts/{post_id}"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(state.db.get_post(&post_id).await.unwrap().is_none());
    assert_eq!(state.db.count_comments_for_post(&post_id).await.unwrap(), 0);

    let (status, _, _) = send(
        &app,
        empty_request("DELETE", &format!("/api/v1/posts/{post_id}"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
