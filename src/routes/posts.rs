// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post routes.

use crate::error::Result;
use crate::extract::{ValidJson, ValidQuery};
use crate::models::{PostPage, PostView, VoteCounts, VoteDirection};
use crate::response::ApiResponse;
use crate::routes::{request_base_url, Empty};
use crate::services::content::DEFAULT_PAGE_SIZE;
use crate::services::{PageLinks, PostFilter};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_posts))
        .route("/category/{category}", get(list_posts_by_category))
        .route("/{post_id}", get(get_post))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_post))
        .route("/{post_id}", patch(update_post).delete(delete_post))
        .route("/{post_id}/upvote", patch(upvote_post))
        .route("/{post_id}/downvote", patch(downvote_post))
}

// ─── Request Types ───────────────────────────────────────────

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    /// Title substring
    pub query: Option<String>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub page: u32,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 300, message = "must be 1 to 300 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "is required"))]
    pub content: String,
    /// Single category name
    pub category: Option<String>,
    /// Category names
    #[serde(default)]
    pub categories: Vec<String>,
}

impl CreatePostRequest {
    fn category_names(&self) -> Vec<String> {
        self.category
            .iter()
            .chain(self.categories.iter())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 300, message = "must be 1 to 300 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub content: Option<String>,
    pub category: Option<String>,
    pub categories: Option<Vec<String>>,
}

impl UpdatePostRequest {
    /// `None` leaves the post's categories unchanged.
    fn category_names(&self) -> Option<Vec<String>> {
        match (&self.category, &self.categories) {
            (None, None) => None,
            (single, many) => Some(
                single
                    .iter()
                    .chain(many.iter().flatten())
                    .cloned()
                    .collect(),
            ),
        }
    }
}

// ─── Handlers ────────────────────────────────────────────────

async fn list_posts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidQuery(params): ValidQuery<ListQuery>,
) -> Result<ApiResponse<PostPage>> {
    let mut links = PageLinks::new(format!(
        "{}/api/v1/posts",
        request_base_url(&headers, &state.config)
    ));
    if let Some(query) = params.query.as_deref().filter(|q| !q.trim().is_empty()) {
        links = links.with_param("query", query);
    }

    let filter = PostFilter {
        title_query: params.query,
        category_name: None,
    };
    let page = state
        .content
        .list_posts(&filter, params.page, params.limit, &links)
        .await?;
    Ok(ApiResponse::ok(page, "Posts fetched successfully"))
}

async fn list_posts_by_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(category): Path<String>,
    ValidQuery(params): ValidQuery<ListQuery>,
) -> Result<ApiResponse<PostPage>> {
    let mut links = PageLinks::new(format!(
        "{}/api/v1/posts/category/{}",
        request_base_url(&headers, &state.config),
        urlencoding::encode(&category)
    ));
    if let Some(query) = params.query.as_deref().filter(|q| !q.trim().is_empty()) {
        links = links.with_param("query", query);
    }

    let filter = PostFilter {
        title_query: params.query,
        category_name: Some(category),
    };
    let page = state
        .content
        .list_posts(&filter, params.page, params.limit, &links)
        .await?;
    Ok(ApiResponse::ok(page, "Posts fetched successfully"))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<ApiResponse<PostView>> {
    let post = state.content.get_post(&post_id).await?;
    Ok(ApiResponse::ok(post, "Post fetched successfully"))
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<CreatePostRequest>,
) -> Result<ApiResponse<PostView>> {
    let post = state
        .content
        .create_post(&body.title, &body.content, &body.category_names())
        .await?;
    Ok(ApiResponse::created(post, "Post created successfully"))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    ValidJson(body): ValidJson<UpdatePostRequest>,
) -> Result<ApiResponse<PostView>> {
    let categories = body.category_names();
    let post = state
        .content
        .update_post(
            &post_id,
            body.title.as_deref(),
            body.content.as_deref(),
            categories.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(post, "Post updated successfully"))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<ApiResponse<Empty>> {
    state.content.delete_post(&post_id).await?;
    Ok(ApiResponse::ok(Empty {}, "Post deleted successfully"))
}

async fn upvote_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<ApiResponse<VoteCounts>> {
    let counts = state.content.vote_on_post(&post_id, VoteDirection::Up).await?;
    Ok(ApiResponse::ok(counts, "Post upvoted successfully"))
}

async fn downvote_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<ApiResponse<VoteCounts>> {
    let counts = state
        .content
        .vote_on_post(&post_id, VoteDirection::Down)
        .await?;
    Ok(ApiResponse::ok(counts, "Post downvoted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_categories_absent_means_unchanged() {
        let body: UpdatePostRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(body.category_names(), None);

        let body: UpdatePostRequest = serde_json::from_str(r#"{"categories":[]}"#).unwrap();
        assert_eq!(body.category_names(), Some(vec![]));

        let body: UpdatePostRequest =
            serde_json::from_str(r#"{"category":"a","categories":["b"]}"#).unwrap();
        assert_eq!(body.category_names(), Some(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_PAGE_SIZE);
        assert!(query.validate().is_ok());
    }
}
