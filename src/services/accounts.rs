// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration, login and password management.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{new_id, User, UserProfile};
use crate::services::mailer::Mailer;
use crate::services::otp;
use crate::services::password::{hash_password_async, verify_password_async};
use crate::services::tokens::{TokenPair, TokenService};
use chrono::Utc;
use std::sync::Arc;

/// How a user identifies themselves at login.
#[derive(Debug, Clone)]
pub enum LoginIdentity {
    Username(String),
    Email(String),
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Usernames and emails are compared case-insensitively.
fn normalize_identity(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Clone)]
pub struct AccountService {
    db: Store,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
}

impl AccountService {
    pub fn new(db: Store, tokens: TokenService, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, tokens, mailer }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserProfile> {
        let username = normalize_identity(username);
        let email = normalize_identity(email);
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::InvalidArgument(
                "Username, email and password are required".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            username,
            email,
            password_hash: hash_password_async(password).await?,
            refresh_token: None,
            password_reset: None,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(UserProfile::from(&user))
    }

    /// Verify credentials and start a session, replacing any previous one.
    pub async fn login(&self, identity: LoginIdentity, password: &str) -> Result<LoginOutcome> {
        let user = match &identity {
            LoginIdentity::Username(name) => {
                self.db
                    .find_user_by_username(&normalize_identity(name))
                    .await?
            }
            LoginIdentity::Email(email) => {
                self.db.find_user_by_email(&normalize_identity(email)).await?
            }
        };

        let Some(user) = user else {
            tracing::warn!(?identity, "Login for unknown user");
            return Err(AppError::Unauthorized);
        };
        if !verify_password_async(password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::Unauthorized);
        }

        let tokens = self.tokens.issue_token_pair(&user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    pub async fn logout(&self, user_id: &str) -> Result<()> {
        self.tokens.invalidate(user_id).await?;
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
    }

    /// Change the password of a logged-in user. Ends the current session.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.load(user_id).await?;
        if !verify_password_async(old_password, &user.password_hash).await? {
            return Err(AppError::InvalidArgument("Invalid old password".to_string()));
        }

        let password_hash = hash_password_async(new_password).await?;
        if !self.db.replace_password(user_id, &password_hash).await? {
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Issue a reset code for the account with this email and mail it.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_identity(email);
        let user = self
            .db
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let code = otp::generate_otp()?;
        let reset = otp::pending_reset(&code, Utc::now());
        if !self.db.set_password_reset(&user.id, Some(&reset)).await? {
            return Err(AppError::NotFound("User".to_string()));
        }

        self.mailer
            .send_forgot_password_otp(&user.email, &code)
            .await?;
        tracing::info!(user_id = %user.id, "Forgot-password code issued");
        Ok(())
    }

    /// Set a new password using a code from [`forgot_password`](Self::forgot_password).
    pub async fn reset_forgotten_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<()> {
        let email = normalize_identity(email);
        let user = self
            .db
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let now = Utc::now();
        let valid = user
            .password_reset
            .as_ref()
            .is_some_and(|reset| otp::verify_otp(reset, code, now));
        if !valid {
            tracing::warn!(user_id = %user.id, "Rejected forgot-password code");
            return Err(AppError::InvalidArgument(
                "Invalid or expired code".to_string(),
            ));
        }

        let password_hash = hash_password_async(new_password).await?;
        if !self.db.replace_password(&user.id, &password_hash).await? {
            return Err(AppError::NotFound("User".to_string()));
        }

        tracing::info!(user_id = %user.id, "Password reset with code");
        Ok(())
    }
}
