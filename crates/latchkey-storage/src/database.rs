// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! The `Database` struct IS the single writer: query modules accept `&Database`
//! and go through `connection().call()`. Do NOT create additional Connection
//! instances for writes.

use std::path::Path;

use latchkey_core::LatchkeyError;
use tracing::debug;

use crate::migrations;

/// Handle to the vault database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, LatchkeyError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, LatchkeyError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(LatchkeyError::storage)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(tokio_rusqlite::Error::Error(e)))?;

        conn.call(move |conn| -> Result<(), LatchkeyError> {
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;"
            ))
            .map_err(db_err)?;
            migrations::run_migrations(conn)
        })
        .await
        .map_err(flatten_tr_err)?;

        debug!(path = %path, wal_mode, "vault database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying serialized connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), LatchkeyError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("vault database closed");
        Ok(())
    }
}

/// Convert a rusqlite error raised inside a `call` closure.
pub(crate) fn db_err(e: rusqlite::Error) -> LatchkeyError {
    LatchkeyError::storage(e)
}

/// Convert tokio-rusqlite errors to [`LatchkeyError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LatchkeyError {
    LatchkeyError::storage(format!("vault database error: {e}"))
}

/// Unwrap a domain error raised inside a `call` closure, keeping its variant.
pub(crate) fn flatten_tr_err(e: tokio_rusqlite::Error<LatchkeyError>) -> LatchkeyError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => LatchkeyError::storage(format!("vault database error: {other}")),
    }
}
