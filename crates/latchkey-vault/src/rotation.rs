// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Re-keying every record under a new master key.
//!
//! All record writes and the metadata swap happen inside one storage
//! transaction. Any failure, including a single record that no longer
//! decrypts, rolls the whole unit back and surfaces as
//! [`LatchkeyError::RotationFailed`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use latchkey_core::{LatchkeyError, VaultMetadata, VaultStore, VaultTransaction};
use tracing::{info, warn};

use crate::crypto;
use crate::secret::MasterKey;

/// Outcome of a committed rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationReport {
    /// Records re-encrypted under the new key.
    pub records: usize,
    /// Sessions invalidated because they held the old key.
    pub sessions_revoked: usize,
}

/// Re-encrypt every record from `old_key` to `new_key` inside `tx`.
///
/// Records keep their `updated_at`, so listing order is unchanged.
pub fn rekey_records(
    tx: &mut dyn VaultTransaction,
    old_key: &MasterKey,
    new_key: &MasterKey,
) -> Result<usize, LatchkeyError> {
    let records = tx.list_records()?;
    for record in &records {
        let aad = crypto::record_aad(&record.record_type);
        let plaintext = crypto::decrypt(old_key, &record.envelope, &aad).map_err(|e| {
            LatchkeyError::RotationFailed {
                reason: format!("record {} could not be decrypted: {e}", record.id),
            }
        })?;
        let envelope = crypto::encrypt(new_key, &plaintext, &aad)?;
        tx.update_envelope(&record.id, &envelope, record.updated_at)?;
    }
    Ok(records.len())
}

/// Re-key all records and install `metadata` atomically.
///
/// Returns the number of records re-encrypted.
pub async fn rotate(
    store: &dyn VaultStore,
    old_key: MasterKey,
    new_key: MasterKey,
    metadata: VaultMetadata,
) -> Result<usize, LatchkeyError> {
    let rekeyed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&rekeyed);

    info!("rotation started");
    let result = store
        .transaction(Box::new(move |tx: &mut dyn VaultTransaction| {
            let count = rekey_records(tx, &old_key, &new_key)?;
            tx.put_metadata(&metadata)?;
            counter.store(count, Ordering::SeqCst);
            Ok(())
        }))
        .await;

    match result {
        Ok(()) => {
            let records = rekeyed.load(Ordering::SeqCst);
            info!(records, "rotation committed");
            Ok(records)
        }
        Err(err) => {
            warn!(error = %err, "rotation rolled back");
            Err(match err {
                LatchkeyError::RotationFailed { .. } => err,
                other => LatchkeyError::RotationFailed {
                    reason: other.to_string(),
                },
            })
        }
    }
}
