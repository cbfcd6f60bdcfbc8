// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Latchkey security engine.
//!
//! Records are sealed with AES-256-GCM under a key derived from the master
//! password with scrypt. The key itself is never stored: a verify blob (a
//! sealed sentinel) proves whether a candidate password is correct. Unlocking
//! mints a bearer token bound to the in-memory key; changing the password
//! re-encrypts every record in one storage transaction and revokes every
//! session.

pub mod backoff;
pub mod crypto;
pub mod items;
pub mod kdf;
pub mod prompt;
pub mod rate_limit;
pub mod rotation;
pub mod secret;
pub mod service;
pub mod session;

pub use backoff::BackoffGuard;
pub use items::{DecryptedItem, ItemView, RecordSummary};
pub use prompt::{master_password, new_master_password, prompt_secret, MASTER_PASSWORD_ENV_VAR};
pub use rate_limit::RateLimiter;
pub use rotation::RotationReport;
pub use secret::MasterKey;
pub use service::{VaultService, VaultStatus, LOCAL_CALLER};
pub use session::SessionStore;
