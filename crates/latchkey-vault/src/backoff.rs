// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progressive delay after consecutive unlock failures.
//!
//! After `n` consecutive failures the caller is stalled for
//! `min(base * 2^(n-1), max)`. A successful unlock or an explicit lock resets
//! the count. With [`BackoffScope::Process`] every caller shares one counter,
//! so one client's failures slow down everyone; [`BackoffScope::PerCaller`]
//! keys the counter by the caller identity instead.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use latchkey_config::model::{BackoffConfig, BackoffScope};
use tracing::debug;

#[derive(Debug)]
pub struct BackoffGuard {
    base: Duration,
    max: Duration,
    scope: BackoffScope,
    process_failures: AtomicU32,
    caller_failures: DashMap<String, u32>,
}

impl BackoffGuard {
    pub fn new(config: &BackoffConfig) -> Self {
        Self::with_delays(config.base_delay(), config.max_delay(), config.scope)
    }

    pub fn with_delays(base: Duration, max: Duration, scope: BackoffScope) -> Self {
        Self {
            base,
            max,
            scope,
            process_failures: AtomicU32::new(0),
            caller_failures: DashMap::new(),
        }
    }

    pub fn scope(&self) -> BackoffScope {
        self.scope
    }

    /// Delay owed after `failures` consecutive failures. Zero for none.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (failures - 1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }

    /// Count one more failure for `caller` and return the delay it earns.
    pub fn record_failure(&self, caller: &str) -> Duration {
        let failures = match self.scope {
            BackoffScope::Process => {
                let previous = self
                    .process_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        Some(n.saturating_add(1))
                    })
                    .unwrap_or(u32::MAX);
                previous.saturating_add(1)
            }
            BackoffScope::PerCaller => {
                let mut count = self.caller_failures.entry(caller.to_string()).or_insert(0);
                *count = count.saturating_add(1);
                *count
            }
        };
        self.delay_for(failures)
    }

    /// Count a failure, then stall the calling task for the earned delay.
    ///
    /// Only the current task sleeps; other requests keep running.
    pub async fn record_failure_and_delay(&self, caller: &str) -> Duration {
        let delay = self.record_failure(caller);
        debug!(
            failures = self.failures(caller),
            delay_ms = delay.as_millis() as u64,
            "backoff applied"
        );
        tokio::time::sleep(delay).await;
        delay
    }

    /// Forget the failures counted for `caller`.
    pub fn reset(&self, caller: &str) {
        match self.scope {
            BackoffScope::Process => self.process_failures.store(0, Ordering::SeqCst),
            BackoffScope::PerCaller => {
                self.caller_failures.remove(caller);
            }
        }
    }

    /// Forget every counter, whatever the scope.
    pub fn reset_all(&self) {
        self.process_failures.store(0, Ordering::SeqCst);
        self.caller_failures.clear();
    }

    /// Consecutive failures currently counted for `caller`.
    pub fn failures(&self, caller: &str) -> u32 {
        match self.scope {
            BackoffScope::Process => self.process_failures.load(Ordering::SeqCst),
            BackoffScope::PerCaller => self.caller_failures.get(caller).map(|c| *c).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(scope: BackoffScope) -> BackoffGuard {
        BackoffGuard::with_delays(Duration::from_millis(500), Duration::from_millis(4000), scope)
    }

    #[test]
    fn delay_doubles_then_caps() {
        let guard = guard(BackoffScope::Process);
        let delays: Vec<u64> = (0..6)
            .map(|_| guard.record_failure("c").as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 4000, 4000]);
    }

    #[test]
    fn delay_for_large_counts_does_not_overflow() {
        let guard = guard(BackoffScope::Process);
        assert_eq!(guard.delay_for(0), Duration::ZERO);
        assert_eq!(guard.delay_for(40), Duration::from_millis(4000));
        assert_eq!(guard.delay_for(u32::MAX), Duration::from_millis(4000));
    }

    #[test]
    fn reset_returns_to_base_delay() {
        let guard = guard(BackoffScope::Process);
        guard.record_failure("c");
        guard.record_failure("c");
        guard.record_failure("c");
        guard.reset("c");
        assert_eq!(guard.failures("c"), 0);
        assert_eq!(guard.record_failure("c"), Duration::from_millis(500));
    }

    #[test]
    fn process_scope_shares_one_counter() {
        let guard = guard(BackoffScope::Process);
        guard.record_failure("alice");
        assert_eq!(guard.record_failure("bob"), Duration::from_millis(1000));
        assert_eq!(guard.failures("carol"), 2);
    }

    #[test]
    fn per_caller_scope_isolates_counters() {
        let guard = guard(BackoffScope::PerCaller);
        guard.record_failure("alice");
        guard.record_failure("alice");
        assert_eq!(guard.record_failure("bob"), Duration::from_millis(500));

        guard.reset("alice");
        assert_eq!(guard.failures("alice"), 0);
        assert_eq!(guard.failures("bob"), 1);

        guard.reset_all();
        assert_eq!(guard.failures("bob"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn record_failure_and_delay_sleeps_for_the_delay() {
        let guard = guard(BackoffScope::Process);
        let start = tokio::time::Instant::now();
        guard.record_failure_and_delay("c").await;
        guard.record_failure_and_delay("c").await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1600), "{elapsed:?}");
    }
}
