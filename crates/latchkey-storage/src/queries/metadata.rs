// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault metadata stored as key/value rows in `vault_meta`.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use latchkey_core::LatchkeyError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{KdfParameters, VaultMetadata};

/// Presence of this key marks an initialized vault.
const SALT_KEY: &str = "kdf_salt";

/// Read metadata, or `None` if the vault was never initialized.
pub fn read(conn: &Connection) -> Result<Option<VaultMetadata>, LatchkeyError> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM vault_meta")
        .map_err(LatchkeyError::storage)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(LatchkeyError::storage)?;

    let mut values = HashMap::new();
    for row in rows {
        let (key, value) = row.map_err(LatchkeyError::storage)?;
        values.insert(key, value);
    }

    if !values.contains_key(SALT_KEY) {
        return Ok(None);
    }
    decode(&values).map(Some)
}

/// True if metadata rows are present.
pub fn exists(conn: &Connection) -> Result<bool, LatchkeyError> {
    conn.query_row(
        "SELECT value FROM vault_meta WHERE key = ?1",
        params![SALT_KEY],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map(|v| v.is_some())
    .map_err(LatchkeyError::storage)
}

/// Upsert every metadata field.
pub fn write(conn: &Connection, metadata: &VaultMetadata) -> Result<(), LatchkeyError> {
    let mut pairs = vec![
        ("vault_version", metadata.schema_version.to_string()),
        (SALT_KEY, URL_SAFE.encode(&metadata.salt)),
        ("kdf_n", metadata.kdf.n.to_string()),
        ("kdf_r", metadata.kdf.r.to_string()),
        ("kdf_p", metadata.kdf.p.to_string()),
        ("kdf_len", metadata.kdf.length.to_string()),
        ("verify_blob", metadata.verify_blob.clone()),
        ("created_at", metadata.created_at.to_string()),
    ];
    if let Some(rotated) = metadata.last_rotated_at {
        pairs.push(("last_rotated_at", rotated.to_string()));
    }

    let mut stmt = conn
        .prepare(
            "INSERT INTO vault_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .map_err(LatchkeyError::storage)?;
    for (key, value) in pairs {
        stmt.execute(params![key, value])
            .map_err(LatchkeyError::storage)?;
    }
    Ok(())
}

fn decode(values: &HashMap<String, String>) -> Result<VaultMetadata, LatchkeyError> {
    let salt = URL_SAFE
        .decode(required(values, SALT_KEY)?)
        .map_err(|e| corrupted(SALT_KEY, e))?;

    Ok(VaultMetadata {
        schema_version: parse(values, "vault_version")?,
        salt,
        kdf: KdfParameters {
            n: parse(values, "kdf_n")?,
            r: parse(values, "kdf_r")?,
            p: parse(values, "kdf_p")?,
            length: parse(values, "kdf_len")?,
        },
        verify_blob: required(values, "verify_blob")?.to_string(),
        created_at: parse(values, "created_at")?,
        last_rotated_at: values
            .get("last_rotated_at")
            .map(|v| v.parse().map_err(|e| corrupted("last_rotated_at", e)))
            .transpose()?,
    })
}

fn required<'a>(values: &'a HashMap<String, String>, key: &str) -> Result<&'a str, LatchkeyError> {
    values
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| LatchkeyError::storage(format!("vault metadata is missing `{key}`")))
}

fn parse<T>(values: &HashMap<String, String>, key: &str) -> Result<T, LatchkeyError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    required(values, key)?
        .parse()
        .map_err(|e| corrupted(key, e))
}

fn corrupted(key: &str, e: impl std::fmt::Display) -> LatchkeyError {
    LatchkeyError::storage(format!("corrupted vault metadata `{key}`: {e}"))
}
