// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The caller-facing vault contract.
//!
//! [`VaultService`] owns the process-wide security state (sessions, rate
//! limiter, backoff guard) and drives the storage and strength collaborators.
//! Every operation on records takes a session token and resolves it first.
//!
//! A rekey gate serializes rotation against everything that could produce a
//! write under the old key: record writes and session minting hold the read
//! side, rotation holds the write side until every old session is revoked.

use std::sync::Arc;

use latchkey_config::model::LatchkeyConfig;
use latchkey_core::{
    Clock, EncryptedRecord, KdfParameters, LatchkeyError, PasswordStrength, RecordTypeInfo,
    VaultMetadata, VaultStore, SCHEMA_VERSION,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::backoff::BackoffGuard;
use crate::crypto;
use crate::items::{self, DecryptedItem, ItemView, RecordSummary};
use crate::kdf;
use crate::rate_limit::RateLimiter;
use crate::rotation::{self, RotationReport};
use crate::secret::MasterKey;
use crate::session::SessionStore;

/// Caller identity used when the embedding surface has none.
pub const LOCAL_CALLER: &str = "local";

/// Answer to [`VaultService::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VaultStatus {
    pub initialized: bool,
}

pub struct VaultService {
    store: Arc<dyn VaultStore>,
    strength: Arc<dyn PasswordStrength>,
    kdf: KdfParameters,
    sessions: SessionStore,
    limiter: RateLimiter,
    backoff: BackoffGuard,
    rekey_gate: RwLock<()>,
}

impl VaultService {
    pub fn new(
        config: &LatchkeyConfig,
        store: Arc<dyn VaultStore>,
        strength: Arc<dyn PasswordStrength>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            strength,
            kdf: KdfParameters::new(config.kdf.n, config.kdf.r, config.kdf.p),
            sessions: SessionStore::new(&config.session, Arc::clone(&clock)),
            limiter: RateLimiter::new(&config.rate_limit, clock),
            backoff: BackoffGuard::new(&config.backoff),
            rekey_gate: RwLock::new(()),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn backoff(&self) -> &BackoffGuard {
        &self.backoff
    }

    // --- Vault lifecycle ---

    pub async fn status(&self) -> Result<VaultStatus, LatchkeyError> {
        Ok(VaultStatus {
            initialized: self.store.get_metadata().await?.is_some(),
        })
    }

    /// Create the vault's salt and verify blob from a new master password.
    pub async fn initialize(&self, password: &SecretString) -> Result<(), LatchkeyError> {
        if self.store.get_metadata().await?.is_some() {
            return Err(LatchkeyError::AlreadyInitialized);
        }
        self.check_strength(password)?;

        let salt = kdf::generate_salt()?;
        let key = derive(password, salt.to_vec(), self.kdf).await?;
        let metadata = VaultMetadata {
            schema_version: SCHEMA_VERSION,
            salt: salt.to_vec(),
            kdf: self.kdf,
            verify_blob: crypto::make_verify_blob(&key)?,
            created_at: now_unix(),
            last_rotated_at: None,
        };
        self.store.insert_metadata(&metadata).await?;

        info!(kdf_n = self.kdf.n, kdf_r = self.kdf.r, kdf_p = self.kdf.p, "vault initialized");
        Ok(())
    }

    /// Unlock on behalf of the local caller.
    pub async fn unlock(&self, password: &SecretString) -> Result<String, LatchkeyError> {
        self.unlock_as(LOCAL_CALLER, password).await
    }

    /// Verify `password` and mint a session token.
    ///
    /// Attempts are rate limited per `caller`. A wrong password stalls the
    /// caller through the backoff guard before `InvalidCredentials` returns.
    pub async fn unlock_as(
        &self,
        caller: &str,
        password: &SecretString,
    ) -> Result<String, LatchkeyError> {
        self.limiter.check(caller)?;

        let token = {
            let _gate = self.rekey_gate.read().await;
            let metadata = self.require_metadata().await?;
            let key = derive(password, metadata.salt.clone(), metadata.kdf).await?;
            if crypto::check_verify_blob(&key, &metadata.verify_blob) {
                Some(self.sessions.create_session(key)?)
            } else {
                None
            }
        };

        match token {
            Some(token) => {
                self.backoff.reset(caller);
                info!("vault unlocked");
                Ok(token)
            }
            None => {
                warn!("unlock failed");
                self.backoff.record_failure_and_delay(caller).await;
                Err(LatchkeyError::InvalidCredentials)
            }
        }
    }

    /// Revoke the local caller's session.
    pub fn lock(&self, token: &str) {
        self.lock_as(LOCAL_CALLER, token);
    }

    /// Revoke `token` and clear `caller`'s failure count. Idempotent.
    pub fn lock_as(&self, caller: &str, token: &str) {
        self.sessions.revoke(token);
        self.backoff.reset(caller);
        info!("vault locked");
    }

    /// Re-key the vault on behalf of the local caller.
    pub async fn change_password(
        &self,
        token: &str,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<RotationReport, LatchkeyError> {
        self.change_password_as(LOCAL_CALLER, token, current_password, new_password)
            .await
    }

    /// Re-key the vault under `new_password`.
    ///
    /// The current password is a guess like any unlock attempt: it counts
    /// against `caller`'s rate limit window and a wrong one stalls through the
    /// backoff guard. Either every record and the metadata move to the new
    /// key, or nothing changes. On success every existing session, including
    /// `token`, is revoked.
    pub async fn change_password_as(
        &self,
        caller: &str,
        token: &str,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<RotationReport, LatchkeyError> {
        let gate = self.rekey_gate.write().await;
        self.require_key(token)?;
        self.check_strength(new_password)?;
        self.limiter.check(caller)?;

        let metadata = self.require_metadata().await?;
        let old_key = derive(current_password, metadata.salt.clone(), metadata.kdf).await?;
        if !crypto::check_verify_blob(&old_key, &metadata.verify_blob) {
            // The stall must not hold readers off the vault.
            drop(gate);
            warn!("password change rejected: current password did not verify");
            self.backoff.record_failure_and_delay(caller).await;
            return Err(LatchkeyError::InvalidCredentials);
        }

        let (new_key, new_metadata) = self
            .next_metadata(new_password, &metadata)
            .await
            .map_err(|e| LatchkeyError::RotationFailed {
                reason: e.to_string(),
            })?;
        let records = rotation::rotate(self.store.as_ref(), old_key, new_key, new_metadata).await?;

        let sessions_revoked = self.sessions.revoke_all();
        self.backoff.reset_all();
        info!(records, sessions = sessions_revoked, "master password changed");
        Ok(RotationReport {
            records,
            sessions_revoked,
        })
    }

    async fn next_metadata(
        &self,
        new_password: &SecretString,
        current: &VaultMetadata,
    ) -> Result<(MasterKey, VaultMetadata), LatchkeyError> {
        let salt = kdf::generate_salt()?;
        let key = derive(new_password, salt.to_vec(), current.kdf).await?;
        let metadata = VaultMetadata {
            salt: salt.to_vec(),
            verify_blob: crypto::make_verify_blob(&key)?,
            last_rotated_at: Some(now_unix()),
            ..current.clone()
        };
        Ok((key, metadata))
    }

    // --- Envelope operations ---

    /// Seal `plaintext` for a record of `record_type`.
    pub async fn encrypt_record(
        &self,
        token: &str,
        record_type: &str,
        plaintext: &[u8],
    ) -> Result<String, LatchkeyError> {
        let key = self.require_key(token)?;
        crypto::encrypt(&key, plaintext, &crypto::record_aad(record_type))
    }

    /// Open an envelope sealed for a record of `record_type`.
    pub async fn decrypt_record(
        &self,
        token: &str,
        record_type: &str,
        envelope: &str,
    ) -> Result<Zeroizing<Vec<u8>>, LatchkeyError> {
        let key = self.require_key(token)?;
        crypto::decrypt(&key, envelope, &crypto::record_aad(record_type))
    }

    // --- Records ---

    pub async fn create_item(
        &self,
        token: &str,
        record_type: &str,
        title: &str,
        payload: &Value,
    ) -> Result<RecordSummary, LatchkeyError> {
        let record_type = record_type.trim();
        let title = title.trim();
        if record_type.is_empty() || title.is_empty() {
            return Err(LatchkeyError::InvalidInput(
                "record type and title are required".to_string(),
            ));
        }
        let plaintext = payload_bytes(payload)?;

        let _gate = self.rekey_gate.read().await;
        let key = self.require_key(token)?;
        let now = now_unix();
        let record = EncryptedRecord {
            id: uuid::Uuid::new_v4().to_string(),
            record_type: record_type.to_string(),
            title: title.to_string(),
            envelope: crypto::encrypt(&key, &plaintext, &crypto::record_aad(record_type))?,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_record(&record).await?;

        info!(record_id = %record.id, record_type = %record.record_type, "record created");
        Ok(RecordSummary {
            id: record.id,
            record_type: record.record_type,
            title: record.title,
        })
    }

    /// Every record, most recently updated first. Unrecoverable records are
    /// reported as [`ItemView::Unreadable`] in place.
    pub async fn list_items(&self, token: &str) -> Result<Vec<ItemView>, LatchkeyError> {
        let key = self.require_key(token)?;
        let records = self.store.list_records().await?;
        let views: Vec<ItemView> = records
            .iter()
            .map(|record| items::view_record(&key, record))
            .collect();
        let unreadable = views.iter().filter(|v| !v.is_readable()).count();
        if unreadable > 0 {
            warn!(unreadable, "some records could not be decrypted");
        }
        Ok(views)
    }

    pub async fn get_item(&self, token: &str, id: &str) -> Result<DecryptedItem, LatchkeyError> {
        let key = self.require_key(token)?;
        let record = self.require_record(id).await?;
        items::open_record(&key, &record)
    }

    /// Replace a record's payload, and its title when one is given.
    ///
    /// The record keeps its type. The existing envelope must still decrypt.
    pub async fn update_item(
        &self,
        token: &str,
        id: &str,
        title: Option<&str>,
        payload: &Value,
    ) -> Result<RecordSummary, LatchkeyError> {
        let title = title.map(str::trim);
        if title.is_some_and(str::is_empty) {
            return Err(LatchkeyError::InvalidInput("title must not be empty".to_string()));
        }
        let plaintext = payload_bytes(payload)?;

        let _gate = self.rekey_gate.read().await;
        let key = self.require_key(token)?;
        let record = self.require_record(id).await?;
        let aad = crypto::record_aad(&record.record_type);
        crypto::decrypt(&key, &record.envelope, &aad)?;

        let title = title.unwrap_or(record.title.as_str()).to_string();
        let envelope = crypto::encrypt(&key, &plaintext, &aad)?;
        if !self
            .store
            .update_record(id, &title, &envelope, now_unix())
            .await?
        {
            return Err(LatchkeyError::NotFound { id: id.to_string() });
        }

        info!(record_id = %id, record_type = %record.record_type, "record updated");
        Ok(RecordSummary {
            id: record.id,
            record_type: record.record_type,
            title,
        })
    }

    pub async fn delete_item(&self, token: &str, id: &str) -> Result<(), LatchkeyError> {
        let _gate = self.rekey_gate.read().await;
        self.require_key(token)?;
        if !self.store.delete_record(id).await? {
            return Err(LatchkeyError::NotFound { id: id.to_string() });
        }
        info!(record_id = %id, "record deleted");
        Ok(())
    }

    /// Known record categories. Not secret, so no token is needed.
    pub async fn record_types(&self) -> Result<Vec<RecordTypeInfo>, LatchkeyError> {
        self.store.list_record_types().await
    }

    // --- Helpers ---

    fn require_key(&self, token: &str) -> Result<MasterKey, LatchkeyError> {
        self.sessions.resolve(token).ok_or_else(|| {
            debug!("token did not resolve");
            LatchkeyError::Unauthorized
        })
    }

    async fn require_metadata(&self) -> Result<VaultMetadata, LatchkeyError> {
        self.store
            .get_metadata()
            .await?
            .ok_or(LatchkeyError::NotInitialized)
    }

    async fn require_record(&self, id: &str) -> Result<EncryptedRecord, LatchkeyError> {
        self.store
            .get_record(id)
            .await?
            .ok_or_else(|| LatchkeyError::NotFound { id: id.to_string() })
    }

    fn check_strength(&self, password: &SecretString) -> Result<(), LatchkeyError> {
        let report = self.strength.evaluate(password.expose_secret());
        if report.ok {
            return Ok(());
        }
        debug!(score = report.score, "password rejected by strength check");
        Err(LatchkeyError::WeakPassword {
            score: report.score,
            warning: report.warning,
            suggestions: report.suggestions,
        })
    }
}

impl std::fmt::Debug for VaultService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultService")
            .field("kdf", &self.kdf)
            .field("sessions", &self.sessions)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// Run the KDF on the blocking pool.
async fn derive(
    password: &SecretString,
    salt: Vec<u8>,
    params: KdfParameters,
) -> Result<MasterKey, LatchkeyError> {
    let password = Zeroizing::new(password.expose_secret().as_bytes().to_vec());
    tokio::task::spawn_blocking(move || kdf::derive_key(&password, &salt, &params))
        .await
        .map_err(|e| LatchkeyError::Internal(format!("key derivation task failed: {e}")))?
}

fn payload_bytes(payload: &Value) -> Result<Zeroizing<Vec<u8>>, LatchkeyError> {
    if !payload.is_object() {
        return Err(LatchkeyError::InvalidInput(
            "payload must be a JSON object".to_string(),
        ));
    }
    serde_json::to_vec(payload)
        .map(Zeroizing::new)
        .map_err(|e| LatchkeyError::InvalidInput(format!("payload could not be serialized: {e}")))
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
