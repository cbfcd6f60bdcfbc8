// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`VaultStore`] trait.

use async_trait::async_trait;
use rusqlite::{Connection, TransactionBehavior};
use tracing::debug;

use latchkey_config::model::StorageConfig;
use latchkey_core::{
    EncryptedRecord, LatchkeyError, RecordTypeInfo, TransactionFn, VaultMetadata, VaultStore,
    VaultTransaction,
};

use crate::database::{db_err, flatten_tr_err, Database};
use crate::queries;

/// SQLite-backed vault store.
///
/// Every operation runs on the single tokio-rusqlite connection thread, so
/// writes are serialized and a transaction opened by [`VaultStore::transaction`]
/// excludes every other writer until it commits or rolls back.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, LatchkeyError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite vault store ready");
        Ok(Self { db })
    }

    /// Open a WAL-mode database at `path`.
    pub async fn open_path(path: &str) -> Result<Self, LatchkeyError> {
        Ok(Self {
            db: Database::open(path).await?,
        })
    }

    /// Checkpoint and close the underlying connection.
    pub async fn close(self) -> Result<(), LatchkeyError> {
        self.db.close().await
    }

    /// Run a synchronous query on the connection thread.
    async fn run<R, F>(&self, f: F) -> Result<R, LatchkeyError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<R, LatchkeyError> + Send + 'static,
    {
        self.db.connection().call(f).await.map_err(flatten_tr_err)
    }
}

/// Write handle lent to a [`TransactionFn`].
struct SqliteTransaction<'a> {
    conn: &'a Connection,
}

impl VaultTransaction for SqliteTransaction<'_> {
    fn list_records(&mut self) -> Result<Vec<EncryptedRecord>, LatchkeyError> {
        queries::records::list_in_insertion_order(self.conn)
    }

    fn update_envelope(
        &mut self,
        id: &str,
        envelope: &str,
        updated_at: i64,
    ) -> Result<(), LatchkeyError> {
        queries::records::update_envelope(self.conn, id, envelope, updated_at)
    }

    fn put_metadata(&mut self, metadata: &VaultMetadata) -> Result<(), LatchkeyError> {
        queries::metadata::write(self.conn, metadata)
    }
}

#[async_trait]
impl VaultStore for SqliteStore {
    async fn get_metadata(&self) -> Result<Option<VaultMetadata>, LatchkeyError> {
        self.run(|conn| queries::metadata::read(conn)).await
    }

    async fn insert_metadata(&self, metadata: &VaultMetadata) -> Result<(), LatchkeyError> {
        let metadata = metadata.clone();
        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db_err)?;
            if queries::metadata::exists(&tx)? {
                return Err(LatchkeyError::AlreadyInitialized);
            }
            queries::metadata::write(&tx, &metadata)?;
            tx.commit().map_err(db_err)
        })
        .await
    }

    async fn list_records(&self) -> Result<Vec<EncryptedRecord>, LatchkeyError> {
        self.run(|conn| queries::records::list_recent(conn)).await
    }

    async fn get_record(&self, id: &str) -> Result<Option<EncryptedRecord>, LatchkeyError> {
        let id = id.to_string();
        self.run(move |conn| queries::records::get(conn, &id)).await
    }

    async fn insert_record(&self, record: &EncryptedRecord) -> Result<(), LatchkeyError> {
        let record = record.clone();
        self.run(move |conn| queries::records::insert(conn, &record))
            .await
    }

    async fn update_record(
        &self,
        id: &str,
        title: &str,
        envelope: &str,
        updated_at: i64,
    ) -> Result<bool, LatchkeyError> {
        let (id, title, envelope) = (id.to_string(), title.to_string(), envelope.to_string());
        self.run(move |conn| queries::records::update(conn, &id, &title, &envelope, updated_at))
            .await
    }

    async fn delete_record(&self, id: &str) -> Result<bool, LatchkeyError> {
        let id = id.to_string();
        self.run(move |conn| queries::records::delete(conn, &id))
            .await
    }

    async fn list_record_types(&self) -> Result<Vec<RecordTypeInfo>, LatchkeyError> {
        self.run(|conn| queries::record_types::list(conn)).await
    }

    async fn transaction(&self, work: TransactionFn) -> Result<(), LatchkeyError> {
        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db_err)?;
            // Dropping `tx` on the error path rolls back.
            work(&mut SqliteTransaction { conn: &tx })?;
            tx.commit().map_err(db_err)
        })
        .await
    }
}
