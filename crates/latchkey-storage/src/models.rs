// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `latchkey-core::types` so the vault
//! engine and the storage backend agree on them. This module re-exports them
//! for convenience within the storage crate.

pub use latchkey_core::types::{EncryptedRecord, KdfParameters, RecordTypeInfo, VaultMetadata};
