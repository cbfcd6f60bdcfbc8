// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted record rows in `vault_items`.

use latchkey_core::LatchkeyError;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::EncryptedRecord;

const COLUMNS: &str = "id, type, title, encrypted_data, created_at, updated_at";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<EncryptedRecord> {
    Ok(EncryptedRecord {
        id: row.get(0)?,
        record_type: row.get(1)?,
        title: row.get(2)?,
        envelope: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn collect(conn: &Connection, sql: &str) -> Result<Vec<EncryptedRecord>, LatchkeyError> {
    let mut stmt = conn.prepare(sql).map_err(LatchkeyError::storage)?;
    let rows = stmt
        .query_map([], row_to_record)
        .map_err(LatchkeyError::storage)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(LatchkeyError::storage)
}

/// Insert a new record.
pub fn insert(conn: &Connection, record: &EncryptedRecord) -> Result<(), LatchkeyError> {
    conn.execute(
        "INSERT INTO vault_items (id, type, title, encrypted_data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id,
            record.record_type,
            record.title,
            record.envelope,
            record.created_at,
            record.updated_at,
        ],
    )
    .map_err(LatchkeyError::storage)?;
    Ok(())
}

/// Fetch a record by id.
pub fn get(conn: &Connection, id: &str) -> Result<Option<EncryptedRecord>, LatchkeyError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM vault_items WHERE id = ?1"),
        params![id],
        row_to_record,
    )
    .optional()
    .map_err(LatchkeyError::storage)
}

/// All records, most recently updated first.
pub fn list_recent(conn: &Connection) -> Result<Vec<EncryptedRecord>, LatchkeyError> {
    collect(
        conn,
        &format!("SELECT {COLUMNS} FROM vault_items ORDER BY updated_at DESC, created_at DESC, rowid DESC"),
    )
}

/// All records in the order they were inserted.
pub fn list_in_insertion_order(conn: &Connection) -> Result<Vec<EncryptedRecord>, LatchkeyError> {
    collect(
        conn,
        &format!("SELECT {COLUMNS} FROM vault_items ORDER BY rowid ASC"),
    )
}

/// Replace title and envelope. Returns `false` if the id is unknown.
pub fn update(
    conn: &Connection,
    id: &str,
    title: &str,
    envelope: &str,
    updated_at: i64,
) -> Result<bool, LatchkeyError> {
    let changed = conn
        .execute(
            "UPDATE vault_items SET title = ?1, encrypted_data = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, envelope, updated_at, id],
        )
        .map_err(LatchkeyError::storage)?;
    Ok(changed > 0)
}

/// Replace only the envelope. Fails with `NotFound` if the id is unknown.
pub fn update_envelope(
    conn: &Connection,
    id: &str,
    envelope: &str,
    updated_at: i64,
) -> Result<(), LatchkeyError> {
    let changed = conn
        .execute(
            "UPDATE vault_items SET encrypted_data = ?1, updated_at = ?2 WHERE id = ?3",
            params![envelope, updated_at, id],
        )
        .map_err(LatchkeyError::storage)?;
    if changed == 0 {
        return Err(LatchkeyError::NotFound { id: id.to_string() });
    }
    Ok(())
}

/// Delete a record. Returns `false` if the id is unknown.
pub fn delete(conn: &Connection, id: &str) -> Result<bool, LatchkeyError> {
    let changed = conn
        .execute("DELETE FROM vault_items WHERE id = ?1", params![id])
        .map_err(LatchkeyError::storage)?;
    Ok(changed > 0)
}
