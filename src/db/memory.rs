// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Every collection is a `DashMap`. Single-document updates go through
//! `get_mut`, which holds the shard write lock, so counter increments and
//! the refresh-token compare-and-swap are atomic. Uniqueness claims are
//! reserved through the entry API before the document is written.

use crate::db::ForumStore;
use crate::error::{AppError, Result};
use crate::models::{
    Category, Comment, PasswordReset, Post, User, VoteCounts, VoteDirection,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
struct Collections {
    users: DashMap<String, User>,
    /// username → user id
    usernames: DashMap<String, String>,
    /// email → user id
    emails: DashMap<String, String>,
    categories: DashMap<String, Category>,
    /// lower-cased category name → category id
    category_names: DashMap<String, String>,
    posts: DashMap<String, Post>,
    comments: DashMap<String, Comment>,
}

/// In-memory store. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Collections>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(map: &DashMap<String, String>, key: String, id: &str, what: &str) -> Result<()> {
        match map.entry(key) {
            Entry::Occupied(existing) if existing.get() != id => {
                Err(AppError::Conflict(format!("{what} already taken")))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(id.to_string());
                Ok(())
            }
        }
    }
}

fn vote_counts(upvotes: i64, downvotes: i64) -> VoteCounts {
    VoteCounts { upvotes, downvotes }
}

#[async_trait]
impl ForumStore for MemoryDb {
    // ─── Users ───────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<()> {
        let db = &self.inner;
        Self::claim(&db.usernames, user.username.clone(), &user.id, "Username")?;
        if let Err(e) = Self::claim(&db.emails, user.email.clone(), &user.id, "Email") {
            db.usernames.remove(&user.username);
            return Err(e);
        }
        db.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.inner.users.get(user_id).map(|u| u.clone()))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let id = self.inner.usernames.get(username).map(|id| id.clone());
        match id {
            Some(id) => self.get_user(&id).await,
            None => Ok(None),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let id = self.inner.emails.get(email).map(|id| id.clone());
        match id {
            Some(id) => self.get_user(&id).await,
            None => Ok(None),
        }
    }

    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<bool> {
        match self.inner.users.get_mut(user_id) {
            Some(mut user) => {
                user.refresh_token = token.map(String::from);
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn swap_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        new: &str,
    ) -> Result<bool> {
        let Some(mut user) = self.inner.users.get_mut(user_id) else {
            return Ok(false);
        };
        if user.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        user.refresh_token = Some(new.to_string());
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_password_reset(
        &self,
        user_id: &str,
        reset: Option<&PasswordReset>,
    ) -> Result<bool> {
        let Some(mut user) = self.inner.users.get_mut(user_id) else {
            return Ok(false);
        };
        user.password_reset = reset.cloned();
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn replace_password(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let Some(mut user) = self.inner.users.get_mut(user_id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.password_reset = None;
        user.refresh_token = None;
        user.updated_at = Utc::now();
        Ok(true)
    }

    // ─── Categories ──────────────────────────────────────────────

    async fn insert_category(&self, category: &Category) -> Result<()> {
        let key = Category::name_key(&category.name);
        Self::claim(&self.inner.category_names, key, &category.id, "Category name")?;
        self.inner
            .categories
            .insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn get_category(&self, category_id: &str) -> Result<Option<Category>> {
        Ok(self.inner.categories.get(category_id).map(|c| c.clone()))
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let id = self
            .inner
            .category_names
            .get(&Category::name_key(name))
            .map(|id| id.clone());
        match id {
            Some(id) => self.get_category(&id).await,
            None => Ok(None),
        }
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self
            .inner
            .categories
            .iter()
            .map(|c| c.value().clone())
            .collect())
    }

    async fn update_category(&self, category: &Category, previous_name: &str) -> Result<()> {
        let new_key = Category::name_key(&category.name);
        let old_key = Category::name_key(previous_name);
        if new_key != old_key {
            Self::claim(
                &self.inner.category_names,
                new_key,
                &category.id,
                "Category name",
            )?;
            self.inner.category_names.remove(&old_key);
        }
        self.inner
            .categories
            .insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn delete_category(&self, category_id: &str) -> Result<bool> {
        match self.inner.categories.remove(category_id) {
            Some((_, category)) => {
                self.inner
                    .category_names
                    .remove(&Category::name_key(&category.name));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ─── Posts ───────────────────────────────────────────────────

    async fn insert_post(&self, post: &Post) -> Result<()> {
        self.inner.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        Ok(self.inner.posts.get(post_id).map(|p| p.clone()))
    }

    async fn list_posts(&self, category_id: Option<&str>) -> Result<Vec<Post>> {
        Ok(self
            .inner
            .posts
            .iter()
            .filter(|p| category_id.map_or(true, |id| p.category_ids.iter().any(|c| c == id)))
            .map(|p| p.value().clone())
            .collect())
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        let mut stored = self
            .inner
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| AppError::NotFound(format!("Post {}", post.id)))?;
        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.category_ids = post.category_ids.clone();
        stored.updated_at = post.updated_at;
        Ok(())
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool> {
        if self.inner.posts.remove(post_id).is_none() {
            return Ok(false);
        }
        self.inner.comments.retain(|_, c| c.post_id != post_id);
        Ok(true)
    }

    async fn increment_post_vote(
        &self,
        post_id: &str,
        direction: VoteDirection,
    ) -> Result<Option<VoteCounts>> {
        Ok(self.inner.posts.get_mut(post_id).map(|mut post| {
            match direction {
                VoteDirection::Up => post.upvotes += 1,
                VoteDirection::Down => post.downvotes += 1,
            }
            vote_counts(post.upvotes, post.downvotes)
        }))
    }

    // ─── Comments ────────────────────────────────────────────────

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        self.inner
            .comments
            .insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        Ok(self.inner.comments.get(comment_id).map(|c| c.clone()))
    }

    async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>> {
        Ok(self
            .inner
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.value().clone())
            .collect())
    }

    async fn count_comments_for_post(&self, post_id: &str) -> Result<u64> {
        Ok(self
            .inner
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .count() as u64)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<()> {
        let mut stored = self
            .inner
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| AppError::NotFound(format!("Comment {}", comment.id)))?;
        stored.content = comment.content.clone();
        stored.updated_at = comment.updated_at;
        Ok(())
    }

    async fn delete_comments(&self, comment_ids: &[String]) -> Result<usize> {
        Ok(comment_ids
            .iter()
            .filter(|id| self.inner.comments.remove(id.as_str()).is_some())
            .count())
    }

    async fn increment_comment_vote(
        &self,
        comment_id: &str,
        direction: VoteDirection,
    ) -> Result<Option<VoteCounts>> {
        Ok(self.inner.comments.get_mut(comment_id).map(|mut comment| {
            match direction {
                VoteDirection::Up => comment.upvotes += 1,
                VoteDirection::Down => comment.downvotes += 1,
            }
            vote_counts(comment.upvotes, comment.downvotes)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::new_id;

    fn user(username: &str, email: &str) -> User {
        User {
            id: new_id(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            refresh_token: None,
            password_reset: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_releases_username_claim() {
        let db = MemoryDb::new();
        db.insert_user(&user("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = db
            .insert_user(&user("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // "bob" must still be available after the failed insert
        db.insert_user(&user("bob", "bob@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_swap_refresh_token_requires_current_value() {
        let db = MemoryDb::new();
        let u = user("carol", "carol@example.com");
        db.insert_user(&u).await.unwrap();
        db.set_refresh_token(&u.id, Some("rt1")).await.unwrap();

        assert!(db.swap_refresh_token(&u.id, "rt1", "rt2").await.unwrap());
        assert!(!db.swap_refresh_token(&u.id, "rt1", "rt3").await.unwrap());
        assert_eq!(
            db.get_user(&u.id).await.unwrap().unwrap().refresh_token,
            Some("rt2".to_string())
        );
    }

    #[tokio::test]
    async fn test_category_rename_moves_name_claim() {
        let db = MemoryDb::new();
        let mut cat = Category {
            id: new_id(),
            name: "General".to_string(),
            description: "Anything".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_category(&cat).await.unwrap();

        cat.name = "Off Topic".to_string();
        db.update_category(&cat, "General").await.unwrap();

        assert!(db.find_category_by_name("general").await.unwrap().is_none());
        assert!(db.find_category_by_name("off topic").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_password_writes_are_field_scoped() {
        let db = MemoryDb::new();
        let u = user("dave", "dave@example.com");
        db.insert_user(&u).await.unwrap();
        db.set_refresh_token(&u.id, Some("rt1")).await.unwrap();

        let reset = PasswordReset {
            otp_digest: "digest".to_string(),
            expires_at: Utc::now(),
        };
        assert!(db.set_password_reset(&u.id, Some(&reset)).await.unwrap());
        let stored = db.get_user(&u.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("rt1"));
        assert_eq!(stored.password_hash, "hash");

        assert!(db.replace_password(&u.id, "new-hash").await.unwrap());
        let stored = db.get_user(&u.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.password_reset.is_none());
        assert!(stored.refresh_token.is_none());

        assert!(!db.replace_password(&new_id(), "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_keeps_votes_cast_after_load() {
        let db = MemoryDb::new();
        let now = Utc::now();
        let post = Post {
            id: new_id(),
            title: "Draft".to_string(),
            content: "body".to_string(),
            category_ids: Vec::new(),
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        db.insert_post(&post).await.unwrap();

        let mut loaded = db.get_post(&post.id).await.unwrap().unwrap();
        db.increment_post_vote(&post.id, VoteDirection::Up)
            .await
            .unwrap();
        loaded.title = "Final".to_string();
        db.update_post(&loaded).await.unwrap();

        let stored = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Final");
        assert_eq!(stored.upvotes, 1);
    }
}
