// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token lifecycle.
//!
//! Access tokens are short-lived HS256 JWTs checked on every authenticated
//! request. Refresh tokens are longer-lived JWTs signed with a separate key;
//! the single valid one per user is persisted on the user document and
//! rotated on every refresh.

use crate::config::Config;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::UserProfile;
use chrono::Utc;
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token ID
    pub jti: String,
}

/// Authenticated user with secrets stripped.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub profile: UserProfile,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.profile.id
    }
}

/// Freshly minted token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Per-user mutex serializing refresh-token rotation within this process.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

#[derive(Clone)]
struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl SigningKey {
    fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    fn sign(&self, user_id: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    /// Signature and expiry check.
    fn verify(&self, token: &str) -> Option<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

/// Issues, verifies, rotates and revokes session tokens.
#[derive(Clone)]
pub struct TokenService {
    db: Store,
    access: SigningKey,
    refresh: SigningKey,
    refresh_locks: RefreshLocks,
}

impl TokenService {
    pub fn new(config: &Config, db: Store) -> Self {
        Self {
            db,
            access: SigningKey::new(&config.access_token_secret, config.access_token_ttl_secs),
            refresh: SigningKey::new(
                &config.refresh_token_secret,
                config.refresh_token_ttl_secs,
            ),
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    fn sign_pair(&self, user_id: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.access.sign(user_id)?,
            refresh_token: self.refresh.sign(user_id)?,
        })
    }

    /// Mint a token pair and make its refresh token the user's only valid one.
    pub async fn issue_token_pair(&self, user_id: &str) -> Result<TokenPair> {
        let pair = self.sign_pair(user_id)?;
        if !self
            .db
            .set_refresh_token(user_id, Some(&pair.refresh_token))
            .await?
        {
            return Err(AppError::Unauthorized);
        }
        Ok(pair)
    }

    /// Resolve an access token to the user it was issued for.
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthUser> {
        let claims = self
            .access
            .verify(access_token)
            .ok_or(AppError::Unauthorized)?;

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            profile: UserProfile::from(&user),
        })
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Only the currently stored refresh token is accepted. A superseded one
    /// (already rotated, or cleared by logout) fails with `Unauthorized`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(AuthUser, TokenPair)> {
        let claims = self
            .refresh
            .verify(refresh_token)
            .ok_or(AppError::InvalidToken)?;
        let user_id = claims.sub;

        let lock = self
            .refresh_locks
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.rotate(&user_id, refresh_token).await
        };

        // Drop the entry once no other refresh for this user holds or awaits it.
        drop(lock);
        self.refresh_locks
            .remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    /// Check `refresh_token` against the stored one and replace it. Callers
    /// hold the user's refresh lock.
    async fn rotate(&self, user_id: &str, refresh_token: &str) -> Result<(AuthUser, TokenPair)> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.refresh_token.as_deref() != Some(refresh_token) {
            tracing::warn!(user_id = %user_id, "Rejected superseded refresh token");
            return Err(AppError::Unauthorized);
        }

        let pair = self.sign_pair(user_id)?;

        // Another instance may have rotated the token since the read above.
        if !self
            .db
            .swap_refresh_token(user_id, refresh_token, &pair.refresh_token)
            .await?
        {
            tracing::warn!(user_id = %user_id, "Refresh token rotated concurrently");
            return Err(AppError::Unauthorized);
        }

        tracing::debug!(user_id = %user_id, "Refresh token rotated");

        Ok((
            AuthUser {
                profile: UserProfile::from(&user),
            },
            pair,
        ))
    }

    /// Revoke the user's refresh token.
    pub async fn invalidate(&self, user_id: &str) -> Result<()> {
        self.db.set_refresh_token(user_id, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ForumStore, MemoryDb};
    use crate::models::{new_id, User};

    async fn setup() -> (TokenService, Store, String) {
        let db: Store = Arc::new(MemoryDb::new());
        let user = User {
            id: new_id(),
            username: "dana".to_string(),
            email: "dana@example.com".to_string(),
            password_hash: "hash".to_string(),
            refresh_token: None,
            password_reset: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_user(&user).await.unwrap();
        (
            TokenService::new(&Config::test_default(), db.clone()),
            db,
            user.id,
        )
    }

    #[tokio::test]
    async fn test_issued_pair_authenticates_and_is_stored() {
        let (tokens, db, user_id) = setup().await;
        let pair = tokens.issue_token_pair(&user_id).await.unwrap();

        let auth = tokens.authenticate(&pair.access_token).await.unwrap();
        assert_eq!(auth.id(), user_id);

        let stored = db.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some(pair.refresh_token));
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use() {
        let (tokens, _db, user_id) = setup().await;
        let first = tokens.issue_token_pair(&user_id).await.unwrap();

        let (_, second) = tokens.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let err = tokens.refresh(&first.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        tokens.refresh(&second.refresh_token).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_has_one_winner() {
        let (tokens, db, user_id) = setup().await;
        let pair = tokens.issue_token_pair(&user_id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let tokens = tokens.clone();
            let refresh_token = pair.refresh_token.clone();
            handles.push(tokio::spawn(async move {
                tokens.refresh(&refresh_token).await
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok((_, rotated)) => winners.push(rotated),
                Err(err) => assert!(matches!(err, AppError::Unauthorized), "{err:?}"),
            }
        }
        assert_eq!(winners.len(), 1);

        let stored = db.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some(winners[0].refresh_token.clone()));
        assert!(tokens.refresh_locks.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_lock_is_dropped_after_rotation() {
        let (tokens, _db, user_id) = setup().await;
        let pair = tokens.issue_token_pair(&user_id).await.unwrap();

        tokens.refresh(&pair.refresh_token).await.unwrap();
        assert!(tokens.refresh_locks.is_empty());

        // Rejected refreshes clean up too
        tokens.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(tokens.refresh_locks.is_empty());
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let (tokens, _db, user_id) = setup().await;
        let pair = tokens.issue_token_pair(&user_id).await.unwrap();

        let err = tokens.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
        let err = tokens.authenticate(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_expired_access_token_is_rejected() {
        let (tokens, _db, user_id) = setup().await;
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            iat: now - 3600,
            exp: now - 1800,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&Config::test_default().access_token_secret),
        )
        .unwrap();

        let err = tokens.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_invalidate_revokes_refresh() {
        let (tokens, _db, user_id) = setup().await;
        let pair = tokens.issue_token_pair(&user_id).await.unwrap();

        tokens.invalidate(&user_id).await.unwrap();

        let err = tokens.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_unknown_user_cannot_get_tokens() {
        let (tokens, _db, _) = setup().await;
        let err = tokens.issue_token_pair(&new_id()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
