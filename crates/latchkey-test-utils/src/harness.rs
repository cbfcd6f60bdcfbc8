// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end vault testing.

use std::sync::Arc;
use std::time::Duration;

use latchkey_config::model::{BackoffScope, LatchkeyConfig, StorageConfig};
use latchkey_core::{LatchkeyError, ManualClock, PasswordStrength};
use latchkey_security::ZxcvbnEstimator;
use latchkey_storage::SqliteStore;
use latchkey_vault::VaultService;
use secrecy::SecretString;

/// A password the default strength oracle accepts.
pub const TEST_PASSWORD: &str = "Gx7#mQv2!pLr9zTb";

/// Wrap a literal as a secret.
pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

/// Builder for creating test vaults with configurable options.
pub struct TestVaultBuilder {
    config: LatchkeyConfig,
    strength: Arc<dyn PasswordStrength>,
    initial_password: Option<String>,
}

impl TestVaultBuilder {
    fn new() -> Self {
        let mut config = LatchkeyConfig::default();
        // Cheap scrypt so tests stay fast.
        config.kdf.n = 1 << 10;
        config.backoff.base_delay_ms = 1;
        config.backoff.max_delay_ms = 8;
        Self {
            config,
            strength: Arc::new(ZxcvbnEstimator::new()),
            initial_password: None,
        }
    }

    /// Initialize the vault with `password` during `build`.
    pub fn initialized_with(mut self, password: &str) -> Self {
        self.initial_password = Some(password.to_string());
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.session.idle_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_rate_limit(mut self, window: Duration, max_attempts: usize) -> Self {
        self.config.rate_limit.window_secs = window.as_secs();
        self.config.rate_limit.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration, scope: BackoffScope) -> Self {
        self.config.backoff.base_delay_ms = base.as_millis() as u64;
        self.config.backoff.max_delay_ms = max.as_millis() as u64;
        self.config.backoff.scope = scope;
        self
    }

    pub fn with_strength(mut self, strength: Arc<dyn PasswordStrength>) -> Self {
        self.strength = strength;
        self
    }

    /// Build the test vault, creating the temp database.
    pub async fn build(self) -> Result<TestVault, LatchkeyError> {
        let temp_dir = tempfile::TempDir::new().map_err(LatchkeyError::storage)?;
        let db_path = temp_dir.path().join("vault.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };

        let store = Arc::new(SqliteStore::open(&config.storage).await?);
        let clock = Arc::new(ManualClock::new());
        let service = Arc::new(VaultService::new(
            &config,
            store.clone(),
            self.strength,
            clock.clone(),
        ));

        if let Some(password) = self.initial_password {
            service.initialize(&secret(&password)).await?;
        }

        Ok(TestVault {
            service,
            store,
            clock,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete vault over temp storage.
pub struct TestVault {
    /// The service under test.
    pub service: Arc<VaultService>,
    /// The backing store, for inspecting or corrupting persisted state.
    pub store: Arc<SqliteStore>,
    /// Drives session expiry and rate-limit windows.
    pub clock: Arc<ManualClock>,
    /// Effective configuration (database path points into the temp dir).
    pub config: LatchkeyConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestVault {
    pub fn builder() -> TestVaultBuilder {
        TestVaultBuilder::new()
    }

    /// A vault initialized with [`TEST_PASSWORD`] and default test settings.
    pub async fn initialized() -> Result<Self, LatchkeyError> {
        Self::builder().initialized_with(TEST_PASSWORD).build().await
    }

    /// Unlock with `password` and return the session token.
    pub async fn unlock(&self, password: &str) -> Result<String, LatchkeyError> {
        self.service.unlock(&secret(password)).await
    }
}
