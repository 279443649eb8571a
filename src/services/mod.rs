// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod categories;
pub mod content;
pub mod mailer;
pub mod otp;
pub mod password;
pub mod tokens;

pub use accounts::{AccountService, LoginIdentity, LoginOutcome};
pub use categories::CategoryService;
pub use content::{ContentService, PageLinks, PostFilter};
pub use mailer::{LogMailer, Mailer};
pub use tokens::{AuthUser, TokenPair, TokenService};
