// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-key sliding-window attempt limiter.
//!
//! Each key keeps the timestamps of its attempts inside the trailing window.
//! Stale timestamps are pruned lazily on every call, and a key whose newest
//! attempt has left the window is dropped, so the map only holds callers that
//! still count against a limit. State lives in memory only and resets when
//! the process restarts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use latchkey_config::model::RateLimitConfig;
use latchkey_core::{Clock, LatchkeyError};
use tracing::warn;

pub struct RateLimiter {
    window: Duration,
    max_attempts: usize,
    attempts: DashMap<String, VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_limits(config.window(), config.max_attempts, clock)
    }

    pub fn with_limits(window: Duration, max_attempts: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            max_attempts,
            attempts: DashMap::new(),
            clock,
        }
    }

    /// Record an attempt for `key` if the window has room.
    ///
    /// A rejected call records nothing.
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).is_ok()
    }

    /// Like [`allow`](Self::allow), but reports how long until a slot frees up.
    pub fn check(&self, key: &str) -> Result<(), LatchkeyError> {
        let now = self.clock.now();
        self.evict_idle(now);

        // The entry guard holds the shard lock, so prune, check and record
        // happen as one step for this key.
        let mut entry = self.attempts.entry(key.to_string()).or_default();
        let history = entry.value_mut();

        while let Some(&oldest) = history.front() {
            if now.duration_since(oldest) >= self.window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() >= self.max_attempts {
            let retry_after = history
                .front()
                .map(|&oldest| self.window.saturating_sub(now.duration_since(oldest)))
                .unwrap_or(self.window);
            warn!(attempts = history.len(), retry_after_ms = retry_after.as_millis() as u64, "rate limited");
            return Err(LatchkeyError::RateLimited { retry_after });
        }

        history.push_back(now);
        Ok(())
    }

    /// Attempts currently counted against `key`, without pruning.
    pub fn recorded(&self, key: &str) -> usize {
        self.attempts.get(key).map(|h| h.len()).unwrap_or(0)
    }

    /// Keys currently held in memory.
    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }

    /// Drop every key with no attempt left inside the window.
    ///
    /// Must run before an entry guard is taken: `retain` locks every shard.
    fn evict_idle(&self, now: Instant) {
        self.attempts.retain(|_, history| {
            history
                .back()
                .is_some_and(|&newest| now.duration_since(newest) < self.window)
        });
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("window", &self.window)
            .field("max_attempts", &self.max_attempts)
            .field("keys", &self.attempts.len())
            .finish()
    }
}
