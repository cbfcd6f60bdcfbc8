// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing views of stored records.

use latchkey_core::{EncryptedRecord, LatchkeyError};
use serde::Serialize;
use serde_json::Value;

use crate::crypto;
use crate::secret::MasterKey;

/// Non-secret identity of a record, returned on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub id: String,
    pub record_type: String,
    pub title: String,
}

/// A record whose payload decrypted and parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecryptedItem {
    pub id: String,
    pub record_type: String,
    pub title: String,
    pub payload: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One element of a listing. A record that cannot be recovered is reported
/// in place instead of failing the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemView {
    Decrypted(DecryptedItem),
    Unreadable {
        id: String,
        record_type: String,
        title: String,
    },
}

impl ItemView {
    pub fn id(&self) -> &str {
        match self {
            Self::Decrypted(item) => &item.id,
            Self::Unreadable { id, .. } => id,
        }
    }

    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Decrypted(_))
    }
}

/// Decrypt a stored record and parse its JSON payload.
///
/// A payload that decrypts but is not JSON is reported as a malformed envelope.
pub(crate) fn open_record(
    key: &MasterKey,
    record: &EncryptedRecord,
) -> Result<DecryptedItem, LatchkeyError> {
    let plaintext = crypto::decrypt(
        key,
        &record.envelope,
        &crypto::record_aad(&record.record_type),
    )?;
    let payload = serde_json::from_slice(&plaintext).map_err(|_| {
        LatchkeyError::MalformedEnvelope("record payload is not valid JSON".to_string())
    })?;
    Ok(DecryptedItem {
        id: record.id.clone(),
        record_type: record.record_type.clone(),
        title: record.title.clone(),
        payload,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// Decrypt a record, or describe it as unreadable.
pub(crate) fn view_record(key: &MasterKey, record: &EncryptedRecord) -> ItemView {
    match open_record(key, record) {
        Ok(item) => ItemView::Decrypted(item),
        Err(_) => ItemView::Unreadable {
            id: record.id.clone(),
            record_type: record.record_type.clone(),
            title: record.title.clone(),
        },
    }
}
