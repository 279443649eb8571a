// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time codes for the forgot-password flow.
//!
//! Codes are 6 decimal digits. Only a SHA-256 digest is stored.

use crate::error::{AppError, Result};
use crate::models::PasswordReset;
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// How long an issued code stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

const OTP_RANGE: u32 = 1_000_000;
// Largest multiple of OTP_RANGE that fits in a u32; values at or above it are redrawn.
const OTP_ACCEPT_BELOW: u32 = u32::MAX - (u32::MAX % OTP_RANGE);

/// Draw a uniformly distributed 6-digit code.
pub fn generate_otp() -> Result<String> {
    let rng = SystemRandom::new();
    loop {
        let mut buf = [0u8; 4];
        rng.fill(&mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        let value = u32::from_le_bytes(buf);
        if value < OTP_ACCEPT_BELOW {
            return Ok(format!("{:06}", value % OTP_RANGE));
        }
    }
}

/// Hex SHA-256 of a code.
pub fn digest_otp(otp: &str) -> String {
    hex::encode(Sha256::digest(otp.trim().as_bytes()))
}

/// Reset state to store for a freshly issued code.
pub fn pending_reset(otp: &str, now: DateTime<Utc>) -> PasswordReset {
    PasswordReset {
        otp_digest: digest_otp(otp),
        expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
    }
}

/// Whether `otp` matches the stored reset and has not expired.
pub fn verify_otp(reset: &PasswordReset, otp: &str, now: DateTime<Utc>) -> bool {
    if now >= reset.expires_at {
        return false;
    }
    let presented = digest_otp(otp);
    presented
        .as_bytes()
        .ct_eq(reset.otp_digest.as_bytes())
        .into()
}
