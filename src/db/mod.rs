// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`ForumStore`] is the contract the services depend on. Two backends
//! implement it: [`FirestoreDb`] for production and [`MemoryDb`] for local
//! development and the offline test suite.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use self::memory::MemoryDb;

use crate::error::Result;
use crate::models::{
    Category, Comment, PasswordReset, Post, User, VoteCounts, VoteDirection,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    pub const CATEGORIES: &str = "categories";
    /// Uniqueness claims, keyed by the lower-cased value
    pub const USERNAME_CLAIMS: &str = "username_claims";
    pub const EMAIL_CLAIMS: &str = "email_claims";
    pub const CATEGORY_NAME_CLAIMS: &str = "category_name_claims";
}

/// Shared store handle.
pub type Store = Arc<dyn ForumStore>;

/// Persistence contract for users, posts, comments and categories.
///
/// Uniqueness (username, email, category name) is enforced here and
/// reported as `AppError::Conflict`. Counter updates are atomic at the
/// storage layer.
#[async_trait]
pub trait ForumStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    /// Insert a new user. Fails with `Conflict` if the username or email is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Overwrite the stored refresh token. Returns `false` if the user does not exist.
    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<bool>;

    /// Replace the stored refresh token with `new` only if it currently equals
    /// `expected`. Returns `false` when it does not (or the user is gone).
    async fn swap_refresh_token(&self, user_id: &str, expected: &str, new: &str)
        -> Result<bool>;

    /// Store or clear the pending forgot-password code, leaving every other
    /// field alone. Returns `false` if the user does not exist.
    async fn set_password_reset(&self, user_id: &str, reset: Option<&PasswordReset>)
        -> Result<bool>;

    /// Replace the password hash and end the session: the pending reset code
    /// and the refresh token are both cleared. Returns `false` if the user
    /// does not exist.
    async fn replace_password(&self, user_id: &str, password_hash: &str) -> Result<bool>;

    // ─── Categories ──────────────────────────────────────────────

    /// Insert a category. Fails with `Conflict` if the name is taken.
    async fn insert_category(&self, category: &Category) -> Result<()>;

    async fn get_category(&self, category_id: &str) -> Result<Option<Category>>;

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Replace a category. `previous_name` is the name before the update so the
    /// uniqueness claim can move. Fails with `Conflict` if the new name is taken.
    async fn update_category(&self, category: &Category, previous_name: &str) -> Result<()>;

    /// Returns `false` if the category did not exist.
    async fn delete_category(&self, category_id: &str) -> Result<bool>;

    // ─── Posts ───────────────────────────────────────────────────

    async fn insert_post(&self, post: &Post) -> Result<()>;

    async fn get_post(&self, post_id: &str) -> Result<Option<Post>>;

    /// All posts, optionally only those tagged with `category_id`. Unordered.
    async fn list_posts(&self, category_id: Option<&str>) -> Result<Vec<Post>>;

    /// Replace title, content and categories of an existing post. Vote
    /// counters are never written from the caller's copy.
    async fn update_post(&self, post: &Post) -> Result<()>;

    /// Delete a post and every comment in its thread. Returns `false` if the
    /// post did not exist.
    async fn delete_post(&self, post_id: &str) -> Result<bool>;

    /// Atomically increment a vote counter. `None` if the post does not exist.
    async fn increment_post_vote(
        &self,
        post_id: &str,
        direction: VoteDirection,
    ) -> Result<Option<VoteCounts>>;

    // ─── Comments ────────────────────────────────────────────────

    async fn insert_comment(&self, comment: &Comment) -> Result<()>;

    async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>>;

    /// Every comment in a post's thread. Unordered.
    async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>>;

    /// Number of comments in a post's thread.
    async fn count_comments_for_post(&self, post_id: &str) -> Result<u64>;

    /// Replace the content of an existing comment. Vote counters are never
    /// written from the caller's copy.
    async fn update_comment(&self, comment: &Comment) -> Result<()>;

    /// Delete the given comments. Returns how many existed.
    async fn delete_comments(&self, comment_ids: &[String]) -> Result<usize>;

    /// Atomically increment a vote counter. `None` if the comment does not exist.
    async fn increment_comment_vote(
        &self,
        comment_id: &str,
        direction: VoteDirection,
    ) -> Result<Option<VoteCounts>>;

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Release backend resources at shutdown.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
