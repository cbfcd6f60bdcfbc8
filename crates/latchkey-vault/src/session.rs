// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unlock sessions: opaque bearer tokens mapped to in-memory keys.
//!
//! A session is active until it sits idle longer than the timeout. Expiry is
//! detected lazily on the next [`SessionStore::resolve`] and is reported the
//! same way as a token that never existed. Minting a token also sweeps every
//! expired session, so abandoned tokens do not pile up. Removing an entry
//! drops its [`MasterKey`], which zeroizes it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use latchkey_config::model::SessionConfig;
use latchkey_core::{Clock, LatchkeyError};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::debug;

use crate::secret::MasterKey;

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

struct SessionEntry {
    key: MasterKey,
    last_activity: Instant,
}

pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    idle_timeout: Duration,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl SessionStore {
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_timeout(config.idle_timeout(), clock)
    }

    pub fn with_timeout(idle_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
            clock,
            rng: SystemRandom::new(),
        }
    }

    /// Mint a token bound to `key`.
    pub fn create_session(&self, key: MasterKey) -> Result<String, LatchkeyError> {
        let swept = self.sweep_expired();
        if swept > 0 {
            debug!(sessions = swept, "expired sessions swept");
        }

        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| LatchkeyError::Crypto("failed to generate session token".to_string()))?;
        let token = URL_SAFE_NO_PAD.encode(bytes);

        self.sessions.insert(
            token.clone(),
            SessionEntry {
                key,
                last_activity: self.clock.now(),
            },
        );
        debug!(sessions = self.sessions.len(), "session created");
        Ok(token)
    }

    /// The key behind `token`, refreshing its idle timer.
    ///
    /// Returns `None` for unknown, revoked, and expired tokens alike.
    pub fn resolve(&self, token: &str) -> Option<MasterKey> {
        // Holding the entry lock keeps a concurrent revoke from racing
        // the expiry check and the key copy.
        match self.sessions.entry(token.to_string()) {
            Entry::Vacant(_) => None,
            Entry::Occupied(mut occupied) => {
                let now = self.clock.now();
                if now.duration_since(occupied.get().last_activity) > self.idle_timeout {
                    occupied.remove();
                    debug!("session expired");
                    return None;
                }
                let entry = occupied.get_mut();
                entry.last_activity = now;
                Some(entry.key.clone())
            }
        }
    }

    /// Remove `token` if present. Idempotent.
    pub fn revoke(&self, token: &str) {
        if self.sessions.remove(token).is_some() {
            debug!("session revoked");
        }
    }

    /// Remove every session. Returns how many were live.
    pub fn revoke_all(&self) -> usize {
        let count = self.sessions.len();
        self.sessions.clear();
        debug!(sessions = count, "all sessions revoked");
        count
    }

    /// Drop every session that has been idle past the timeout.
    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.duration_since(entry.last_activity) <= self.idle_timeout);
        before.saturating_sub(self.sessions.len())
    }

    /// Number of sessions held in memory, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
