// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// Google Cloud Firestore (or its emulator).
    Firestore,
    /// In-process store, lost on restart.
    Memory,
}

impl FromStr for DatabaseBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(DatabaseBackend::Firestore),
            "memory" => Ok(DatabaseBackend::Memory),
            _ => Err(ConfigError::Invalid("DATABASE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Base URL used for absolute pagination links when the request has no Host header
    pub public_url: String,
    /// Browser origin allowed by CORS
    pub cors_origin: String,
    /// Whether credential cookies carry the `Secure` attribute
    pub cookie_secure: bool,
    /// Store backend
    pub database_backend: DatabaseBackend,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,

    // --- Secrets ---
    /// HS256 key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            public_url: "http://localhost:8080".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            cookie_secure: false,
            database_backend: DatabaseBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            access_token_secret: b"test_access_key_32_bytes_minimum!".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_ttl_secs: 10 * 24 * 60 * 60,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id = env::var("GCP_PROJECT_ID").ok();
        let database_backend = match env::var("DATABASE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) if gcp_project_id.is_some() => DatabaseBackend::Firestore,
            Err(_) => DatabaseBackend::Memory,
        };

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            public_url: env::var("PUBLIC_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            cookie_secure: parse_or("COOKIE_SECURE", true)?,
            database_backend,
            gcp_project_id: gcp_project_id.unwrap_or_else(|| "local-dev".to_string()),

            access_token_secret: required_secret("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required_secret("REFRESH_TOKEN_SECRET")?,
            access_token_ttl_secs: parse_or("ACCESS_TOKEN_TTL_SECS", 15 * 60)?,
            refresh_token_ttl_secs: parse_or("REFRESH_TOKEN_TTL_SECS", 10 * 24 * 60 * 60)?,
        })
    }
}

fn required_secret(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    let value = env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))?;
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.into_bytes())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
