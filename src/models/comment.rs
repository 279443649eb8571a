// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Comment model. Comments form a reply tree rooted at a post.

use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Comment stored in the `comments` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Root of the thread. Set once at creation from the verified parent chain.
    pub post_id: String,
    /// Set when this comment replies to another comment of the same post
    #[serde(default)]
    pub parent_comment_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Comment with its direct reply count and, when requested, the reply subtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub content: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub upvotes: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub downvotes: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub reply_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
    pub created_at: String,
    pub updated_at: String,
}

impl CommentView {
    pub fn new(comment: &Comment, reply_count: u64) -> Self {
        Self {
            id: comment.id.clone(),
            post_id: comment.post_id.clone(),
            parent_comment_id: comment.parent_comment_id.clone(),
            content: comment.content.clone(),
            upvotes: comment.upvotes,
            downvotes: comment.downvotes,
            reply_count,
            replies: None,
            created_at: format_utc_rfc3339(comment.created_at),
            updated_at: format_utc_rfc3339(comment.updated_at),
        }
    }
}
