// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and session routes.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::extract::ValidJson;
use crate::middleware::auth::{bearer_token, AuthUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::models::UserProfile;
use crate::response::ApiResponse;
use crate::routes::Empty;
use crate::services::{LoginIdentity, TokenPair};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Routes that do not need a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register-user", post(register_user))
        .route("/login-user", post(login_user))
        .route("/refresh-access-token", post(refresh_access_token))
        .route("/forgot-password", post(forgot_password))
        .route(
            "/change-forget-password",
            post(change_forget_password).patch(change_forget_password),
        )
}

/// Routes behind `require_auth`.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout-user", post(logout_user))
        .route("/current-user", get(current_user))
        .route("/change-password", post(change_password))
}

// ─── Cookies ─────────────────────────────────────────────────

fn credential_cookie(config: &Config, name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn with_session_cookies(jar: CookieJar, config: &Config, tokens: &TokenPair) -> CookieJar {
    jar.add(credential_cookie(
        config,
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        config.access_token_ttl_secs,
    ))
    .add(credential_cookie(
        config,
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        config.refresh_token_ttl_secs,
    ))
}

/// Expired twin of a credential cookie, same attributes as the original.
fn removal_cookie(config: &Config, name: &'static str) -> Cookie<'static> {
    let mut cookie = credential_cookie(config, name, String::new(), 0);
    cookie.make_removal();
    cookie
}

/// Emitted even when the request authenticated with a bearer token.
fn without_session_cookies(jar: CookieJar, config: &Config) -> CookieJar {
    jar.add(removal_cookie(config, ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(config, REFRESH_TOKEN_COOKIE))
}

// ─── Request/Response Types ──────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32, message = "must be 3 to 32 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub old_password: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeForgetPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub new_password: String,
}

// ─── Handlers ────────────────────────────────────────────────

async fn register_user(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<ApiResponse<UserProfile>> {
    let user = state
        .accounts
        .register(&body.username, &body.email, &body.password)
        .await?;
    Ok(ApiResponse::created(user, "User created successfully"))
}

async fn login_user(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let identity = match (body.username, body.email) {
        (Some(username), _) if !username.trim().is_empty() => LoginIdentity::Username(username),
        (_, Some(email)) if !email.trim().is_empty() => LoginIdentity::Email(email),
        _ => {
            return Err(AppError::InvalidArgument(
                "Username or email is required".to_string(),
            ))
        }
    };

    let outcome = state.accounts.login(identity, &body.password).await?;
    let jar = with_session_cookies(jar, &state.config, &outcome.tokens);

    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: outcome.user,
                access_token: outcome.tokens.access_token,
                refresh_token: outcome.tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

async fn logout_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Empty>)> {
    state.accounts.logout(user.id()).await?;
    Ok((
        without_session_cookies(jar, &state.config),
        ApiResponse::ok(Empty {}, "User logged out successfully"),
    ))
}

async fn current_user(Extension(user): Extension<AuthUser>) -> ApiResponse<UserProfile> {
    ApiResponse::ok(user.profile, "User fetched successfully")
}

/// Refresh token from the cookie, then the JSON body, then `Authorization: Bearer`.
async fn refresh_access_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<UserProfile>)> {
    let from_body = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AppError::InvalidArgument(format!("Invalid JSON body: {}", e)))?
    };

    let token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .or(from_body.refresh_token.filter(|t| !t.is_empty()))
        .or_else(|| bearer_token(&headers).map(String::from))
        .ok_or(AppError::Unauthorized)?;

    let (user, tokens) = state.tokens.refresh(&token).await?;
    let jar = with_session_cookies(jar, &state.config, &tokens);

    Ok((
        jar,
        ApiResponse::ok(user.profile, "Access token refreshed successfully"),
    ))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    ValidJson(body): ValidJson<ChangePasswordRequest>,
) -> Result<(CookieJar, ApiResponse<Empty>)> {
    state
        .accounts
        .change_password(user.id(), &body.old_password, &body.new_password)
        .await?;
    Ok((
        without_session_cookies(jar, &state.config),
        ApiResponse::ok(Empty {}, "Password changed successfully"),
    ))
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<ForgotPasswordRequest>,
) -> Result<ApiResponse<Empty>> {
    state.accounts.forgot_password(&body.email).await?;
    Ok(ApiResponse::ok(Empty {}, "OTP sent successfully"))
}

async fn change_forget_password(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<ChangeForgetPasswordRequest>,
) -> Result<ApiResponse<Empty>> {
    state
        .accounts
        .reset_forgotten_password(&body.email, &body.otp, &body.new_password)
        .await?;
    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}
