// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod category;
pub mod comment;
pub mod post;
pub mod user;

pub use category::{Category, CategorySummary, CategoryView};
pub use comment::{Comment, CommentView};
pub use post::{Post, PostPage, PostView};
pub use user::{PasswordReset, User, UserProfile};

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Generate a new document ID (UUIDv7, ordered by creation time).
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Check that `raw` is a structurally valid document ID and normalize it.
///
/// `what` names the parameter in the error message.
pub fn parse_id(raw: &str, what: &str) -> Result<String> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::InvalidArgument(format!("Invalid {what}: {raw}")))
}

/// Which counter a vote increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Document field holding the counter.
    pub fn field(self) -> &'static str {
        match self {
            VoteDirection::Up => "upvotes",
            VoteDirection::Down => "downvotes",
        }
    }
}

/// Vote counters after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VoteCounts {
    pub upvotes: i64,
    pub downvotes: i64,
}
