// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Latchkey vault.
//!
//! Messages never carry key material, passwords, tokens, or plaintext.
//! Authentication failures on unlock and rotation are collapsed into
//! [`LatchkeyError::InvalidCredentials`] so a caller cannot tell a wrong
//! password apart from a tampered verify blob.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Latchkey crates.
#[derive(Debug, Error)]
pub enum LatchkeyError {
    /// No vault metadata is present; the vault must be initialized first.
    #[error("vault is not initialized")]
    NotInitialized,

    /// `initialize` was called on a vault that already has metadata.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// The password-strength oracle rejected a new master password.
    #[error("master password is too weak (score {score}/4)")]
    WeakPassword {
        /// Strength score in `0..=4`.
        score: u8,
        /// Primary warning from the strength oracle, if any.
        warning: Option<String>,
        /// Suggestions for a stronger password.
        suggestions: Vec<String>,
    },

    /// The supplied master password did not verify against the vault.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Too many attempts inside the sliding window.
    #[error("too many attempts, retry after {retry_after:?}")]
    RateLimited {
        /// Time until the oldest recorded attempt leaves the window.
        retry_after: Duration,
    },

    /// Missing, invalid, or expired session token.
    #[error("vault locked or invalid token")]
    Unauthorized,

    /// Envelope did not split into `version:nonce:ciphertext` or failed to decode.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Envelope carries a format version this build cannot read.
    #[error("unsupported envelope version `{0}`")]
    UnsupportedVersion(String),

    /// AEAD tag check failed: wrong key, tampered data, or wrong associated data.
    #[error("envelope authentication failed")]
    AuthenticationFailed,

    /// Master-key rotation failed and was rolled back.
    #[error("key rotation failed and was rolled back: {reason}")]
    RotationFailed {
        /// Description of the underlying cause.
        reason: String,
    },

    /// A record id that does not exist.
    #[error("record not found: {id}")]
    NotFound {
        /// The requested record id.
        id: String,
    },

    /// Request rejected before any cryptographic work was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Cryptographic primitive failure (RNG, key construction, KDF parameters).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LatchkeyError {
    /// Wrap any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// True for the three envelope failures that mean "cannot recover this record".
    pub fn is_record_unreadable(&self) -> bool {
        matches!(
            self,
            Self::MalformedEnvelope(_) | Self::UnsupportedVersion(_) | Self::AuthenticationFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_failures_are_record_unreadable() {
        assert!(LatchkeyError::MalformedEnvelope("x".into()).is_record_unreadable());
        assert!(LatchkeyError::UnsupportedVersion("v9".into()).is_record_unreadable());
        assert!(LatchkeyError::AuthenticationFailed.is_record_unreadable());
        assert!(!LatchkeyError::InvalidCredentials.is_record_unreadable());
        assert!(!LatchkeyError::Unauthorized.is_record_unreadable());
    }

    #[test]
    fn invalid_credentials_message_does_not_distinguish_causes() {
        let msg = LatchkeyError::InvalidCredentials.to_string();
        assert_eq!(msg, "invalid credentials");
    }

    #[test]
    fn rate_limited_reports_retry_window() {
        let err = LatchkeyError::RateLimited {
            retry_after: Duration::from_secs(12),
        };
        assert!(err.to_string().contains("12s"));
    }
}
