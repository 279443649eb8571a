// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Forum API: posts, threaded comments, categories and user accounts
//! behind a JSON REST interface.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{AccountService, CategoryService, ContentService, Mailer, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Shared by every service; closed on shutdown
    pub db: Store,
    pub tokens: TokenService,
    pub accounts: AccountService,
    pub content: ContentService,
    pub categories: CategoryService,
}

impl AppState {
    /// Wire every service to one store.
    pub fn new(config: Config, db: Store, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = TokenService::new(&config, db.clone());
        let accounts = AccountService::new(db.clone(), tokens.clone(), mailer);
        let content = ContentService::new(db.clone());
        let categories = CategoryService::new(db.clone());
        Self {
            config,
            db,
            tokens,
            accounts,
            content,
            categories,
        }
    }
}
