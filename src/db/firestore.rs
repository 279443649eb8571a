// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore backend for [`ForumStore`].
//!
//! Uniqueness of usernames, emails and category names is enforced with claim
//! documents (`username_claims/{username}` etc.) written in the same
//! transaction as the document they protect. Vote counters use server-side
//! increment transforms.

use crate::db::{collections, ForumStore};
use crate::error::{AppError, Result};
use crate::models::{
    Category, Comment, PasswordReset, Post, User, VoteCounts, VoteDirection,
};
use async_trait::async_trait;
use chrono::Utc;
use firestore::{paths, FirestoreWritePrecondition};
use futures_util::{stream, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Owner of a unique value.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claim {
    owner_id: String,
}

/// Result of a transaction that reserves unique values.
enum ClaimOutcome {
    Written,
    Taken(&'static str),
}

/// Claim document IDs must not contain `/`.
fn claim_id(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Emulator connection with a dummy bearer token.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJmb3J1bSJ9."
                        .to_string()
                        .into(),
                ),
                expiry: Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore emulator");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Offline client. Every operation fails with `AppError::Database`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(db_err)
    }

    async fn put_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<()>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
    {
        let _: T = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Write only `fields` of an existing document. Fields outside the mask,
    /// such as vote counters, keep their stored values.
    async fn patch_doc<T>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
        fields: Vec<String>,
    ) -> Result<()>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
    {
        let _: T = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields)
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn owner_of(&self, collection: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .get_doc::<Claim>(collection, &claim_id(key))
            .await?
            .map(|c| c.owner_id))
    }

    /// Read-modify-write a user inside a transaction. `modify` returns `false`
    /// to leave the document untouched. Returns whether a write happened.
    async fn modify_user<F>(&self, user_id: &str, modify: F) -> Result<bool>
    where
        F: Fn(&mut User) -> bool + Send + Sync + 'static,
    {
        let client = self.get_client()?;
        let user_id = user_id.to_string();
        let modify = Arc::new(modify);

        client
            .run_transaction(|db, transaction| {
                let user_id = user_id.clone();
                let modify = Arc::clone(&modify);
                async move {
                    let current: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&user_id)
                        .await?;
                    let Some(mut user) = current else {
                        return Ok(false);
                    };
                    if !modify(&mut user) {
                        return Ok(false);
                    }
                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user_id)
                        .object(&user)
                        .add_to_transaction(transaction)?;
                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(db_err)
    }

    /// Apply a server-side increment and read the counters back.
    async fn increment_vote(
        &self,
        collection: &str,
        id: &str,
        direction: VoteDirection,
    ) -> Result<Option<VoteCounts>> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .transforms(|t| t.fields([t.field(direction.field()).increment(1)]))
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add increment to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        #[derive(Deserialize)]
        struct Counters {
            #[serde(default)]
            upvotes: i64,
            #[serde(default)]
            downvotes: i64,
        }

        Ok(self
            .get_doc::<Counters>(collection, id)
            .await?
            .map(|c| VoteCounts {
                upvotes: c.upvotes,
                downvotes: c.downvotes,
            }))
    }

    /// Delete documents by ID using chunked transactions.
    async fn batch_delete(&self, ids: &[String], collection: &str) -> Result<()> {
        let client = self.get_client()?;

        for chunk in ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for doc_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl ForumStore for FirestoreDb {
    // ─── Users ───────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<()> {
        let client = self.get_client()?;
        let user = user.clone();

        let outcome = client
            .run_transaction(|db, transaction| {
                let user = user.clone();
                async move {
                    let username_claim: Option<Claim> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERNAME_CLAIMS)
                        .obj()
                        .one(&claim_id(&user.username))
                        .await?;
                    if username_claim.is_some() {
                        return Ok(ClaimOutcome::Taken("Username"));
                    }
                    let email_claim: Option<Claim> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::EMAIL_CLAIMS)
                        .obj()
                        .one(&claim_id(&user.email))
                        .await?;
                    if email_claim.is_some() {
                        return Ok(ClaimOutcome::Taken("Email"));
                    }

                    let claim = Claim {
                        owner_id: user.id.clone(),
                    };
                    db.fluent()
                        .update()
                        .in_col(collections::USERNAME_CLAIMS)
                        .document_id(claim_id(&user.username))
                        .object(&claim)
                        .add_to_transaction(transaction)?;
                    db.fluent()
                        .update()
                        .in_col(collections::EMAIL_CLAIMS)
                        .document_id(claim_id(&user.email))
                        .object(&claim)
                        .add_to_transaction(transaction)?;
                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.id)
                        .object(&user)
                        .add_to_transaction(transaction)?;
                    Ok(ClaimOutcome::Written)
                }
                .boxed()
            })
            .await
            .map_err(db_err)?;

        match outcome {
            ClaimOutcome::Written => Ok(()),
            ClaimOutcome::Taken(what) => Err(AppError::Conflict(format!("{what} already taken"))),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.get_doc(collections::USERS, user_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.owner_of(collections::USERNAME_CLAIMS, username).await? {
            Some(id) => self.get_user(&id).await,
            None => Ok(None),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.owner_of(collections::EMAIL_CLAIMS, email).await? {
            Some(id) => self.get_user(&id).await,
            None => Ok(None),
        }
    }

    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<bool> {
        let token = token.map(String::from);
        self.modify_user(user_id, move |user| {
            user.refresh_token = token.clone();
            user.updated_at = Utc::now();
            true
        })
        .await
    }

    async fn swap_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        new: &str,
    ) -> Result<bool> {
        let expected = expected.to_string();
        let new = new.to_string();
        self.modify_user(user_id, move |user| {
            if user.refresh_token.as_deref() != Some(expected.as_str()) {
                return false;
            }
            user.refresh_token = Some(new.clone());
            user.updated_at = Utc::now();
            true
        })
        .await
    }

    async fn set_password_reset(
        &self,
        user_id: &str,
        reset: Option<&PasswordReset>,
    ) -> Result<bool> {
        let reset = reset.cloned();
        self.modify_user(user_id, move |user| {
            user.password_reset = reset.clone();
            user.updated_at = Utc::now();
            true
        })
        .await
    }

    async fn replace_password(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let password_hash = password_hash.to_string();
        self.modify_user(user_id, move |user| {
            user.password_hash = password_hash.clone();
            user.password_reset = None;
            user.refresh_token = None;
            user.updated_at = Utc::now();
            true
        })
        .await
    }

    // ─── Categories ──────────────────────────────────────────────

    async fn insert_category(&self, category: &Category) -> Result<()> {
        self.update_category(category, "").await
    }

    async fn get_category(&self, category_id: &str) -> Result<Option<Category>> {
        self.get_doc(collections::CATEGORIES, category_id).await
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let key = Category::name_key(name);
        match self.owner_of(collections::CATEGORY_NAME_CLAIMS, &key).await? {
            Some(id) => self.get_category(&id).await,
            None => Ok(None),
        }
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CATEGORIES)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Also used for inserts, with an empty `previous_name`.
    async fn update_category(&self, category: &Category, previous_name: &str) -> Result<()> {
        let client = self.get_client()?;
        let category = category.clone();
        let new_key = Category::name_key(&category.name);
        let old_key = Category::name_key(previous_name);

        let outcome = client
            .run_transaction(|db, transaction| {
                let category = category.clone();
                let new_key = new_key.clone();
                let old_key = old_key.clone();
                async move {
                    if new_key != old_key {
                        let existing: Option<Claim> = db
                            .fluent()
                            .select()
                            .by_id_in(collections::CATEGORY_NAME_CLAIMS)
                            .obj()
                            .one(&claim_id(&new_key))
                            .await?;
                        if existing.is_some_and(|c| c.owner_id != category.id) {
                            return Ok(ClaimOutcome::Taken("Category name"));
                        }
                        db.fluent()
                            .update()
                            .in_col(collections::CATEGORY_NAME_CLAIMS)
                            .document_id(claim_id(&new_key))
                            .object(&Claim {
                                owner_id: category.id.clone(),
                            })
                            .add_to_transaction(transaction)?;
                        if !old_key.is_empty() {
                            db.fluent()
                                .delete()
                                .from(collections::CATEGORY_NAME_CLAIMS)
                                .document_id(claim_id(&old_key))
                                .add_to_transaction(transaction)?;
                        }
                    }
                    db.fluent()
                        .update()
                        .in_col(collections::CATEGORIES)
                        .document_id(&category.id)
                        .object(&category)
                        .add_to_transaction(transaction)?;
                    Ok(ClaimOutcome::Written)
                }
                .boxed()
            })
            .await
            .map_err(db_err)?;

        match outcome {
            ClaimOutcome::Written => Ok(()),
            ClaimOutcome::Taken(what) => Err(AppError::Conflict(format!("{what} already taken"))),
        }
    }

    async fn delete_category(&self, category_id: &str) -> Result<bool> {
        let Some(category) = self.get_category(category_id).await? else {
            return Ok(false);
        };
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        client
            .fluent()
            .delete()
            .from(collections::CATEGORY_NAME_CLAIMS)
            .document_id(claim_id(&Category::name_key(&category.name)))
            .add_to_transaction(&mut transaction)
            .map_err(db_err)?;
        client
            .fluent()
            .delete()
            .from(collections::CATEGORIES)
            .document_id(category_id)
            .add_to_transaction(&mut transaction)
            .map_err(db_err)?;
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(true)
    }

    // ─── Posts ───────────────────────────────────────────────────

    async fn insert_post(&self, post: &Post) -> Result<()> {
        self.put_doc(collections::POSTS, &post.id, post).await
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        self.get_doc(collections::POSTS, post_id).await
    }

    async fn list_posts(&self, category_id: Option<&str>) -> Result<Vec<Post>> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::POSTS);

        let query = match category_id {
            Some(id) => {
                let id = id.to_string();
                query.filter(move |q| q.field("category_ids").array_contains(id.clone()))
            }
            None => query,
        };

        query.obj().query().await.map_err(db_err)
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        if self.get_post(&post.id).await?.is_none() {
            return Err(AppError::NotFound(format!("Post {}", post.id)));
        }
        self.patch_doc(
            collections::POSTS,
            &post.id,
            post,
            paths!(Post::{title, content, category_ids, updated_at}),
        )
        .await
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool> {
        if self.get_post(post_id).await?.is_none() {
            return Ok(false);
        }

        let comment_ids: Vec<String> = self
            .list_comments_for_post(post_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        self.batch_delete(&comment_ids, collections::COMMENTS).await?;

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::POSTS)
            .document_id(post_id)
            .execute()
            .await
            .map_err(db_err)?;

        tracing::debug!(post_id, comments = comment_ids.len(), "Deleted post thread");
        Ok(true)
    }

    async fn increment_post_vote(
        &self,
        post_id: &str,
        direction: VoteDirection,
    ) -> Result<Option<VoteCounts>> {
        // The transform would otherwise create a bare document.
        if self.get_post(post_id).await?.is_none() {
            return Ok(None);
        }
        self.increment_vote(collections::POSTS, post_id, direction)
            .await
    }

    // ─── Comments ────────────────────────────────────────────────

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        self.put_doc(collections::COMMENTS, &comment.id, comment)
            .await
    }

    async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        self.get_doc(collections::COMMENTS, comment_id).await
    }

    async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMENTS)
            .filter(|q| q.for_all([q.field("post_id").eq(post_id)]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn count_comments_for_post(&self, post_id: &str) -> Result<u64> {
        Ok(self.list_comments_for_post(post_id).await?.len() as u64)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<()> {
        if self.get_comment(&comment.id).await?.is_none() {
            return Err(AppError::NotFound(format!("Comment {}", comment.id)));
        }
        self.patch_doc(
            collections::COMMENTS,
            &comment.id,
            comment,
            paths!(Comment::{content, updated_at}),
        )
        .await
    }

    async fn delete_comments(&self, comment_ids: &[String]) -> Result<usize> {
        let existing: Vec<String> = stream::iter(comment_ids.to_vec())
            .map(|id| async move {
                let found = self.get_comment(&id).await?.is_some();
                Ok::<_, AppError>(found.then_some(id))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<String>>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<String>>>>()?
            .into_iter()
            .flatten()
            .collect();

        self.batch_delete(&existing, collections::COMMENTS).await?;
        Ok(existing.len())
    }

    async fn increment_comment_vote(
        &self,
        comment_id: &str,
        direction: VoteDirection,
    ) -> Result<Option<VoteCounts>> {
        if self.get_comment(comment_id).await?.is_none() {
            return Ok(None);
        }
        self.increment_vote(collections::COMMENTS, comment_id, direction)
            .await
    }
}
