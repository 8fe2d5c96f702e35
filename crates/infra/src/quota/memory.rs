//! In-memory quota store
//!
//! Implements the [`QuotaStore`] contract in process: accounts are created
//! lazily with the configured limit, the ceiling check and the increment
//! happen under one lock, refunds are floored at zero and deduplicated by
//! reservation token, and usage resets when a monthly cycle rolls over.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meterguard_common::resilience::{Clock, SystemClock};
use meterguard_core::{QuotaStore, QuotaStoreError};
use meterguard_domain::{QuotaAccount, QuotaConfig, UserId};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Call counters for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Successful increments
    pub increments: u64,
    /// Increments refused by the ceiling
    pub rejections: u64,
    /// Refunds applied
    pub refunds: u64,
    /// Refunds ignored because the token was already refunded or unknown
    pub duplicate_refunds: u64,
}

#[derive(Default)]
struct StoreState {
    accounts: HashMap<UserId, QuotaAccount>,
    /// Unrefunded reservations of the current cycle, by token
    outstanding: HashMap<Uuid, (UserId, u32)>,
    limit_overrides: HashMap<UserId, u32>,
}

impl StoreState {
    /// Fetch or create the account, applying any due rollover
    fn account_mut(
        &mut self,
        user: &UserId,
        default_limit: u32,
        now: DateTime<Utc>,
    ) -> &mut QuotaAccount {
        let Self { accounts, outstanding, limit_overrides } = self;
        let limit = limit_overrides.get(user).copied().unwrap_or(default_limit);
        let account = accounts
            .entry(user.clone())
            .or_insert_with(|| QuotaAccount::new(user.clone(), limit, now));

        if account.roll_over(now) {
            // Reservations from the previous cycle no longer refund
            outstanding.retain(|_, (owner, _)| *owner != *user);
            debug!(user = %user, cycle_start = %account.cycle_start, "quota cycle rolled over");
        }
        account
    }
}

/// Process-local transactional quota store
pub struct InMemoryQuotaStore<C: Clock = SystemClock> {
    state: Mutex<StoreState>,
    default_limit: u32,
    clock: C,
    increments: AtomicU64,
    rejections: AtomicU64,
    refunds: AtomicU64,
    duplicate_refunds: AtomicU64,
}

impl InMemoryQuotaStore<SystemClock> {
    pub fn new(default_limit: u32) -> Self {
        Self::with_clock(default_limit, SystemClock)
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(config.monthly_limit)
    }
}

impl<C: Clock> InMemoryQuotaStore<C> {
    pub fn with_clock(default_limit: u32, clock: C) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            default_limit,
            clock,
            increments: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            refunds: AtomicU64::new(0),
            duplicate_refunds: AtomicU64::new(0),
        }
    }

    /// Override the limit for one user, including an existing account
    pub fn set_limit(&self, user: &UserId, limit: u32) {
        let mut state = self.state.lock();
        state.limit_overrides.insert(user.clone(), limit);
        if let Some(account) = state.accounts.get_mut(user) {
            account.limit = limit;
        }
    }

    /// Set a user's usage directly, creating the account if needed
    pub fn set_used(&self, user: &UserId, used: u32) {
        let now = self.clock.utc_now();
        let mut state = self.state.lock();
        state.account_mut(user, self.default_limit, now).used = used;
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            increments: self.increments.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            refunds: self.refunds.load(Ordering::Relaxed),
            duplicate_refunds: self.duplicate_refunds.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl<C: Clock> QuotaStore for InMemoryQuotaStore<C> {
    async fn increment_usage(
        &self,
        user: &UserId,
        amount: u32,
        token: Uuid,
    ) -> Result<u32, QuotaStoreError> {
        let now = self.clock.utc_now();
        let mut state = self.state.lock();
        let account = state.account_mut(user, self.default_limit, now);

        if account.would_exceed(amount) {
            self.rejections.fetch_add(1, Ordering::Relaxed);
            let (limit, used) = (account.limit, account.used);
            return Err(QuotaStoreError::QuotaExceeded { limit, used });
        }

        account.used += amount;
        let remaining = account.remaining();
        state.outstanding.insert(token, (user.clone(), amount));
        self.increments.fetch_add(1, Ordering::Relaxed);
        Ok(remaining)
    }

    async fn refund(&self, user: &UserId, amount: u32, token: Uuid) -> Result<(), QuotaStoreError> {
        let now = self.clock.utc_now();
        let mut state = self.state.lock();
        match state.outstanding.remove(&token) {
            Some((owner, reserved)) if owner == *user => {
                let account = state.account_mut(user, self.default_limit, now);
                account.used = account.used.saturating_sub(amount.min(reserved));
                self.refunds.fetch_add(1, Ordering::Relaxed);
            }
            Some(entry) => {
                state.outstanding.insert(token, entry);
                self.duplicate_refunds.fetch_add(1, Ordering::Relaxed);
                debug!(user = %user, token = %token, "ignoring refund for another user's token");
            }
            None => {
                self.duplicate_refunds.fetch_add(1, Ordering::Relaxed);
                debug!(user = %user, token = %token, "ignoring refund for unknown token");
            }
        }
        Ok(())
    }

    async fn account(&self, user: &UserId) -> Result<QuotaAccount, QuotaStoreError> {
        let now = self.clock.utc_now();
        let mut state = self.state.lock();
        Ok(state.account_mut(user, self.default_limit, now).clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use meterguard_common::resilience::MockClock;

    use super::*;

    fn user() -> UserId {
        UserId::new("user-1")
    }

    /// Validates lazy creation with the default limit.
    #[tokio::test]
    async fn test_account_created_lazily() {
        let store = InMemoryQuotaStore::new(100);
        let account = store.account(&user()).await.unwrap();
        assert_eq!(account.used, 0);
        assert_eq!(account.limit, 100);
    }

    /// Validates the ceiling check is strict and non-mutating.
    ///
    /// Assertions:
    /// - Confirms reaching the limit exactly succeeds.
    /// - Confirms the next increment is rejected with the current usage.
    /// - Ensures a rejected increment leaves `used` unchanged.
    #[tokio::test]
    async fn test_ceiling_enforced() {
        let store = InMemoryQuotaStore::new(3);
        assert_eq!(store.increment_usage(&user(), 3, Uuid::now_v7()).await.unwrap(), 0);

        let err = store.increment_usage(&user(), 1, Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err, QuotaStoreError::QuotaExceeded { limit: 3, used: 3 });
        assert_eq!(store.account(&user()).await.unwrap().used, 3);
        assert_eq!(store.stats().rejections, 1);
    }

    /// Validates refund deduplication by token.
    ///
    /// Assertions:
    /// - Confirms the first refund restores usage.
    /// - Confirms a repeated refund with the same token is ignored.
    /// - Confirms an unknown token never drives usage negative.
    #[tokio::test]
    async fn test_refund_is_idempotent() {
        let store = InMemoryQuotaStore::new(10);
        let keep = Uuid::now_v7();
        let token = Uuid::now_v7();
        store.increment_usage(&user(), 2, keep).await.unwrap();
        store.increment_usage(&user(), 2, token).await.unwrap();

        store.refund(&user(), 2, token).await.unwrap();
        store.refund(&user(), 2, token).await.unwrap();
        store.refund(&user(), 5, Uuid::now_v7()).await.unwrap();

        assert_eq!(store.account(&user()).await.unwrap().used, 2);
        let stats = store.stats();
        assert_eq!(stats.refunds, 1);
        assert_eq!(stats.duplicate_refunds, 2);
    }

    #[tokio::test]
    async fn test_refund_with_foreign_token_ignored() {
        let store = InMemoryQuotaStore::new(10);
        let token = Uuid::now_v7();
        store.increment_usage(&user(), 4, token).await.unwrap();

        store.refund(&UserId::new("someone-else"), 4, token).await.unwrap();
        store.refund(&user(), 4, token).await.unwrap();
        assert_eq!(store.account(&user()).await.unwrap().used, 0);
    }

    /// Validates concurrent increments never pass the ceiling.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_respect_ceiling() {
        let store = Arc::new(InMemoryQuotaStore::new(50));
        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.increment_usage(&UserId::new("user-1"), 1, Uuid::now_v7()).await.is_ok()
                })
            })
            .collect();

        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 50);
        assert_eq!(store.account(&user()).await.unwrap().used, 50);
    }

    /// Validates monthly rollover and stale-token handling.
    ///
    /// Assertions:
    /// - Confirms usage resets once the next cycle starts.
    /// - Confirms a refund for a previous-cycle reservation is ignored.
    #[tokio::test]
    async fn test_monthly_rollover() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
        let clock = MockClock::starting_at(start);
        let store = InMemoryQuotaStore::with_clock(5, clock.clone());

        let token = Uuid::now_v7();
        store.increment_usage(&user(), 5, token).await.unwrap();
        assert!(store.increment_usage(&user(), 1, Uuid::now_v7()).await.is_err());

        clock.advance_secs(31 * 24 * 60 * 60);
        let account = store.account(&user()).await.unwrap();
        assert_eq!(account.used, 0);
        assert!(account.cycle_start > start);

        store.increment_usage(&user(), 1, Uuid::now_v7()).await.unwrap();
        store.refund(&user(), 5, token).await.unwrap();
        assert_eq!(store.account(&user()).await.unwrap().used, 1);
    }

    /// Validates per-user limit overrides.
    #[tokio::test]
    async fn test_set_limit_and_used() {
        let store = InMemoryQuotaStore::from_config(&QuotaConfig::default());
        store.set_used(&user(), 100);
        assert!(store.increment_usage(&user(), 1, Uuid::now_v7()).await.is_err());

        store.set_limit(&user(), 150);
        assert_eq!(store.increment_usage(&user(), 1, Uuid::now_v7()).await.unwrap(), 49);

        let other = UserId::new("vip");
        store.set_limit(&other, 1000);
        assert_eq!(store.account(&other).await.unwrap().limit, 1000);
    }
}
