//! Rate limit ledger
//!
//! Tracks, per operation key, the instant until which calls are refused
//! locally. An entry exists only while a cooldown is active: expired entries
//! are evicted on access, and optionally by a background sweeper.
//!
//! Time comes from an injected [`Clock`] so expiry is testable without
//! sleeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use meterguard_common::resilience::{Clock, SystemClock};
use meterguard_domain::OperationKey;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-key cooldown tracker
pub struct RateLimitLedger<C: Clock = SystemClock> {
    entries: Mutex<HashMap<OperationKey, DateTime<Utc>>>,
    clock: C,
}

impl RateLimitLedger<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RateLimitLedger<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimitLedger<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { entries: Mutex::new(HashMap::new()), clock }
    }

    /// Current wall time according to the ledger's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc_now()
    }

    /// Whether a cooldown is active for `key`
    pub fn is_open(&self, key: &OperationKey) -> bool {
        self.cooldown_until(key).is_some()
    }

    /// End of the active cooldown for `key`, evicting it if expired
    pub fn cooldown_until(&self, key: &OperationKey) -> Option<DateTime<Utc>> {
        let now = self.clock.utc_now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(&until) if now < until => Some(until),
            Some(_) => {
                entries.remove(key);
                debug!(key = %key, "cooldown expired");
                None
            }
            None => None,
        }
    }

    /// Set or overwrite the cooldown for `key`
    pub fn open(&self, key: &OperationKey, until: DateTime<Utc>) {
        self.entries.lock().insert(key.clone(), until);
        info!(key = %key, retry_after = %until, "cooldown opened");
    }

    /// Open a cooldown lasting `cooldown` from now and return its end
    pub fn open_for(&self, key: &OperationKey, cooldown: Duration) -> DateTime<Utc> {
        let until = chrono::Duration::from_std(cooldown)
            .ok()
            .and_then(|delta| self.clock.utc_now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.open(key, until);
        until
    }

    /// Remove the entry for `key`
    ///
    /// Returns `true` if a still-active cooldown was removed.
    pub fn clear(&self, key: &OperationKey) -> bool {
        let removed = self.entries.lock().remove(key);
        match removed {
            Some(until) if self.clock.utc_now() < until => {
                info!(key = %key, "cooldown cleared");
                true
            }
            _ => false,
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.utc_now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, until| now < *until);
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Sweep expired entries every `interval` until `cancel` fires
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = self.sweep_expired();
                        if removed > 0 {
                            debug!(removed, "swept expired cooldowns");
                        }
                    }
                }
            }
        })
    }
}
