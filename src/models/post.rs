// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Forum post model for storage and API.

use crate::models::CategorySummary;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Post stored in the `posts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Category IDs in the order they were given
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Post enriched with read-time aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub categories: Vec<CategorySummary>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub upvotes: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub downvotes: i64,
    /// Every comment in the post's thread, replies included
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_comments: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl PostView {
    pub fn new(post: &Post, categories: Vec<CategorySummary>, total_comments: u64) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            categories,
            upvotes: post.upvotes,
            downvotes: post.downvotes,
            total_comments,
            created_at: format_utc_rfc3339(post.created_at),
            updated_at: format_utc_rfc3339(post.updated_at),
        }
    }
}

/// One page of posts with navigation links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PostPage {
    pub items: Vec<PostView>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u32,
    pub total_pages: u32,
    /// Absolute URL of the next page, absent on the last page
    pub next_page: Option<String>,
    /// Absolute URL of the previous page, absent on the first page
    pub prev_page: Option<String>,
}
