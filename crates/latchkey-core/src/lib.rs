// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Latchkey secrets vault.
//!
//! This crate provides the error taxonomy, the persisted data model, the
//! collaborator traits (storage, password strength), and the injectable
//! clock used throughout the Latchkey workspace.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LatchkeyError;
pub use traits::{PasswordStrength, TransactionFn, VaultStore, VaultTransaction};
pub use types::{
    EncryptedRecord, KdfParameters, RecordTypeInfo, StrengthReport, VaultMetadata, KEY_LEN,
    SALT_LEN, SCHEMA_VERSION,
};
