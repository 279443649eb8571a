// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Comment routes. Every comment path is scoped by its post.

use crate::error::Result;
use crate::extract::{ValidJson, ValidQuery};
use crate::models::{CommentView, VoteCounts, VoteDirection};
use crate::response::ApiResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{post_id}", get(list_comments))
        .route("/{post_id}/{comment_id}", get(get_comment))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{post_id}", post(create_comment))
        .route(
            "/{post_id}/{comment_id}",
            post(reply_to_comment)
                .patch(update_comment)
                .put(update_comment)
                .delete(delete_comment),
        )
        .route(
            "/{post_id}/{comment_id}/upvote",
            post(upvote_comment).patch(upvote_comment),
        )
        .route(
            "/{post_id}/{comment_id}/downvote",
            post(downvote_comment).patch(downvote_comment),
        )
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ThreadQuery {
    #[serde(default)]
    pub nested: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 10000, message = "must be 1 to 10000 characters"))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedComments {
    pub deleted: usize,
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    ValidQuery(params): ValidQuery<ThreadQuery>,
) -> Result<ApiResponse<Vec<CommentView>>> {
    let comments = state.content.list_comments(&post_id, params.nested).await?;
    Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<ApiResponse<CommentView>> {
    let comment = state.content.get_comment(&post_id, &comment_id).await?;
    Ok(ApiResponse::ok(comment, "Comment fetched successfully"))
}

async fn create_comment(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    ValidJson(body): ValidJson<CommentRequest>,
) -> Result<ApiResponse<CommentView>> {
    let comment = state
        .content
        .create_comment(&post_id, None, &body.content)
        .await?;
    Ok(ApiResponse::created(comment, "Comment created successfully"))
}

async fn reply_to_comment(
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
    ValidJson(body): ValidJson<CommentRequest>,
) -> Result<ApiResponse<CommentView>> {
    let reply = state
        .content
        .create_comment(&post_id, Some(&comment_id), &body.content)
        .await?;
    Ok(ApiResponse::created(reply, "Reply created successfully"))
}

async fn update_comment(
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
    ValidJson(body): ValidJson<CommentRequest>,
) -> Result<ApiResponse<CommentView>> {
    let comment = state
        .content
        .update_comment(&post_id, &comment_id, &body.content)
        .await?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<ApiResponse<DeletedComments>> {
    let deleted = state.content.delete_comment(&post_id, &comment_id).await?;
    Ok(ApiResponse::ok(
        DeletedComments { deleted },
        "Comment deleted successfully",
    ))
}

async fn vote(
    state: &AppState,
    post_id: &str,
    comment_id: &str,
    direction: VoteDirection,
) -> Result<VoteCounts> {
    state
        .content
        .vote_on_comment(post_id, comment_id, direction)
        .await
}

async fn upvote_comment(
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<ApiResponse<VoteCounts>> {
    let counts = vote(&state, &post_id, &comment_id, VoteDirection::Up).await?;
    Ok(ApiResponse::ok(counts, "Comment upvoted successfully"))
}

async fn downvote_comment(
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<ApiResponse<VoteCounts>> {
    let counts = vote(&state, &post_id, &comment_id, VoteDirection::Down).await?;
    Ok(ApiResponse::ok(counts, "Comment downvoted successfully"))
}
