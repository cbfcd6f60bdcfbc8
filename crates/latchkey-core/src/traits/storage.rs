// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage collaborator for vault metadata and encrypted records.

use async_trait::async_trait;

use crate::error::LatchkeyError;
use crate::types::{EncryptedRecord, RecordTypeInfo, VaultMetadata};

/// Unit of work executed by [`VaultStore::transaction`].
///
/// Returning `Ok` commits every write made through the handle; returning
/// `Err` rolls all of them back.
pub type TransactionFn =
    Box<dyn FnOnce(&mut dyn VaultTransaction) -> Result<(), LatchkeyError> + Send>;

/// Writes available inside a transactional scope.
///
/// Implementations must guarantee that no other writer can observe or
/// produce record writes while the scope is open.
pub trait VaultTransaction {
    /// All records in insertion order.
    fn list_records(&mut self) -> Result<Vec<EncryptedRecord>, LatchkeyError>;

    /// Replace a record's envelope. Fails if the record does not exist.
    fn update_envelope(
        &mut self,
        id: &str,
        envelope: &str,
        updated_at: i64,
    ) -> Result<(), LatchkeyError>;

    /// Overwrite the vault metadata.
    fn put_metadata(&mut self, metadata: &VaultMetadata) -> Result<(), LatchkeyError>;
}

/// Persistence backend for a single vault.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Vault metadata, or `None` if the vault was never initialized.
    async fn get_metadata(&self) -> Result<Option<VaultMetadata>, LatchkeyError>;

    /// Persist metadata for a fresh vault.
    ///
    /// Fails with [`LatchkeyError::AlreadyInitialized`] if metadata exists.
    async fn insert_metadata(&self, metadata: &VaultMetadata) -> Result<(), LatchkeyError>;

    /// All records, most recently updated first.
    async fn list_records(&self) -> Result<Vec<EncryptedRecord>, LatchkeyError>;

    async fn get_record(&self, id: &str) -> Result<Option<EncryptedRecord>, LatchkeyError>;

    async fn insert_record(&self, record: &EncryptedRecord) -> Result<(), LatchkeyError>;

    /// Update title and envelope. Returns `false` if no such record exists.
    async fn update_record(
        &self,
        id: &str,
        title: &str,
        envelope: &str,
        updated_at: i64,
    ) -> Result<bool, LatchkeyError>;

    /// Returns `false` if no such record exists.
    async fn delete_record(&self, id: &str) -> Result<bool, LatchkeyError>;

    /// Known record categories.
    async fn list_record_types(&self) -> Result<Vec<RecordTypeInfo>, LatchkeyError>;

    /// Run `work` atomically: commit on `Ok`, roll back on `Err`.
    async fn transaction(&self, work: TransactionFn) -> Result<(), LatchkeyError>;
}
