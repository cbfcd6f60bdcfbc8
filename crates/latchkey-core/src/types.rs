// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the vault engine and its collaborators.

use serde::{Deserialize, Serialize};

use crate::error::LatchkeyError;

/// Current layout version of [`VaultMetadata`].
pub const SCHEMA_VERSION: u32 = 1;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// scrypt cost parameters persisted alongside the salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParameters {
    /// CPU/memory cost factor. Must be a power of two, at least 2.
    pub n: u64,
    /// Block size factor.
    pub r: u32,
    /// Parallelism factor.
    pub p: u32,
    /// Derived key length in bytes. Must equal [`KEY_LEN`].
    pub length: usize,
}

impl Default for KdfParameters {
    fn default() -> Self {
        Self {
            n: 1 << 14,
            r: 8,
            p: 1,
            length: KEY_LEN,
        }
    }
}

impl KdfParameters {
    /// Build parameters with the fixed key length.
    pub fn new(n: u64, r: u32, p: u32) -> Self {
        Self {
            n,
            r,
            p,
            length: KEY_LEN,
        }
    }

    /// Check the persisted invariants before any derivation is attempted.
    pub fn validate(&self) -> Result<(), LatchkeyError> {
        if self.n < 2 || !self.n.is_power_of_two() {
            return Err(LatchkeyError::Crypto(format!(
                "kdf cost factor n must be a power of two >= 2, got {}",
                self.n
            )));
        }
        if self.r == 0 || self.p == 0 {
            return Err(LatchkeyError::Crypto(
                "kdf factors r and p must be at least 1".to_string(),
            ));
        }
        if self.length != KEY_LEN {
            return Err(LatchkeyError::Crypto(format!(
                "kdf output length must be {KEY_LEN} bytes, got {}",
                self.length
            )));
        }
        Ok(())
    }

    /// `log2(n)`, the form scrypt implementations take.
    pub fn log_n(&self) -> u8 {
        self.n.trailing_zeros() as u8
    }
}

/// The single per-vault metadata row set.
///
/// Created once on initialization, replaced only by a successful rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultMetadata {
    pub schema_version: u32,
    pub salt: Vec<u8>,
    pub kdf: KdfParameters,
    /// Envelope of the sentinel under the derived key.
    pub verify_blob: String,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds of the last successful rotation.
    pub last_rotated_at: Option<i64>,
}

/// A stored record. Only `envelope` is secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub id: String,
    /// Free-form category tag, bound into the envelope as associated data.
    pub record_type: String,
    pub title: String,
    pub envelope: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A record category offered to callers (web, email, ssh, note, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTypeInfo {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// Outcome of a password-strength evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StrengthReport {
    pub ok: bool,
    /// Score in `0..=4`.
    pub score: u8,
    pub warning: Option<String>,
    pub suggestions: Vec<String>,
}
