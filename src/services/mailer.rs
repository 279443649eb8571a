// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound mail.

use crate::error::Result;
use async_trait::async_trait;

/// Delivers account mail. Implementations own transport and templating.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_forgot_password_otp(&self, email: &str, otp: &str) -> Result<()>;
}

/// Records sends in the log without delivering anything.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_forgot_password_otp(&self, email: &str, _otp: &str) -> Result<()> {
        tracing::info!(email, "Forgot-password code issued (log mailer, not delivered)");
        Ok(())
    }
}
