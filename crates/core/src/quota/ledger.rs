//! Quota ledger client
//!
//! Thin wrapper over a [`QuotaStore`] that turns each debit into a
//! [`Reservation`] carrying a refund token. Zero-cost operations never touch
//! the store.

use std::sync::Arc;

use meterguard_common::error::{CommonError, ErrorSeverity};
use meterguard_common::{impl_error_classification, ErrorClassification};
use meterguard_domain::{QuotaAccount, UserId};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::ports::{QuotaStore, QuotaStoreError};

const STORE_SERVICE: &str = "quota_store";

/// Errors returned by the quota ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("quota exceeded: {used}/{limit} units used")]
    QuotaExceeded { used: u32, limit: u32 },

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(LedgerError, Common,
    Self::QuotaExceeded { .. } => {
        retryable: false,
        severity: ErrorSeverity::Warning,
        critical: false,
    }
);

impl From<QuotaStoreError> for LedgerError {
    fn from(err: QuotaStoreError) -> Self {
        match err {
            QuotaStoreError::QuotaExceeded { limit, used } => Self::QuotaExceeded { used, limit },
            QuotaStoreError::Unavailable { message } => {
                Self::Common(CommonError::backend(STORE_SERVICE, message, false))
            }
        }
    }
}

/// A provisional debit that can be reversed exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub user: UserId,
    pub cost: u32,
    pub token: Uuid,
    /// Units remaining after the debit, `None` when the store was skipped
    pub remaining: Option<u32>,
}

impl Reservation {
    /// Whether this reservation skipped the store (`cost == 0`)
    pub fn is_noop(&self) -> bool {
        self.cost == 0
    }
}

/// Client for reserving and refunding quota
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn QuotaStore>,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self { store }
    }

    /// Debit `cost` units for `user`
    pub async fn reserve(&self, user: &UserId, cost: u32) -> Result<Reservation, LedgerError> {
        let token = Uuid::now_v7();
        if cost == 0 {
            return Ok(Reservation { user: user.clone(), cost, token, remaining: None });
        }

        let remaining = self.store.increment_usage(user, cost, token).await?;
        debug!(user = %user, cost, remaining, token = %token, "quota reserved");
        Ok(Reservation { user: user.clone(), cost, token, remaining: Some(remaining) })
    }

    /// Reverse a reservation
    ///
    /// Called at most once per reservation; failures are returned to the
    /// caller and never retried here.
    pub async fn refund(&self, reservation: &Reservation) -> Result<(), LedgerError> {
        if reservation.is_noop() {
            return Ok(());
        }

        let user = &reservation.user;
        match self.store.refund(user, reservation.cost, reservation.token).await {
            Ok(()) => {
                debug!(
                    user = %user,
                    cost = reservation.cost,
                    token = %reservation.token,
                    "quota refunded"
                );
                Ok(())
            }
            Err(err) => {
                let err = LedgerError::from(err);
                warn!(
                    user = %user,
                    cost = reservation.cost,
                    token = %reservation.token,
                    severity = %err.severity(),
                    "quota refund failed"
                );
                Err(err)
            }
        }
    }

    /// Units left this cycle, advisory only
    pub async fn remaining(&self, user: &UserId) -> Result<u32, LedgerError> {
        Ok(self.snapshot(user).await?.remaining())
    }

    /// Current account view, advisory only
    pub async fn snapshot(&self, user: &UserId) -> Result<QuotaAccount, LedgerError> {
        Ok(self.store.account(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;

    use super::*;

    /// Store double that records calls and can be switched offline
    #[derive(Default)]
    struct RecordingStore {
        used: Mutex<u32>,
        calls: Mutex<Vec<&'static str>>,
        offline: Mutex<bool>,
    }

    const LIMIT: u32 = 3;

    #[async_trait]
    impl QuotaStore for RecordingStore {
        async fn increment_usage(
            &self,
            _user: &UserId,
            amount: u32,
            _token: Uuid,
        ) -> Result<u32, QuotaStoreError> {
            self.calls.lock().push("increment");
            if *self.offline.lock() {
                return Err(QuotaStoreError::unavailable("connection reset"));
            }
            let mut used = self.used.lock();
            if *used + amount > LIMIT {
                return Err(QuotaStoreError::QuotaExceeded { limit: LIMIT, used: *used });
            }
            *used += amount;
            Ok(LIMIT - *used)
        }

        async fn refund(
            &self,
            _user: &UserId,
            amount: u32,
            _token: Uuid,
        ) -> Result<(), QuotaStoreError> {
            self.calls.lock().push("refund");
            if *self.offline.lock() {
                return Err(QuotaStoreError::unavailable("connection reset"));
            }
            let mut used = self.used.lock();
            *used = used.saturating_sub(amount);
            Ok(())
        }

        async fn account(&self, user: &UserId) -> Result<QuotaAccount, QuotaStoreError> {
            let mut account = QuotaAccount::new(user.clone(), LIMIT, Utc::now());
            account.used = *self.used.lock();
            Ok(account)
        }
    }

    fn ledger() -> (Arc<RecordingStore>, QuotaLedger) {
        let store = Arc::new(RecordingStore::default());
        (store.clone(), QuotaLedger::new(store))
    }

    /// Validates reserve and refund round through the store.
    ///
    /// Assertions:
    /// - Confirms `remaining` reflects the debit.
    /// - Confirms refund restores the advisory snapshot.
    #[tokio::test]
    async fn test_reserve_then_refund() {
        let (_, ledger) = ledger();
        let user = UserId::new("u1");

        let reservation = ledger.reserve(&user, 2).await.unwrap();
        assert_eq!(reservation.remaining, Some(1));
        assert_eq!(ledger.remaining(&user).await.unwrap(), 1);

        ledger.refund(&reservation).await.unwrap();
        assert_eq!(ledger.snapshot(&user).await.unwrap().used, 0);
    }

    /// Validates zero-cost reservations skip the store.
    #[tokio::test]
    async fn test_zero_cost_skips_store() {
        let (store, ledger) = ledger();
        let reservation = ledger.reserve(&UserId::new("u1"), 0).await.unwrap();
        assert!(reservation.is_noop());
        ledger.refund(&reservation).await.unwrap();
        assert!(store.calls.lock().is_empty());
    }

    /// Validates store errors map to ledger errors.
    ///
    /// Assertions:
    /// - Confirms the ceiling yields `QuotaExceeded` that is not retryable.
    /// - Confirms an offline store yields a non-retryable backend error.
    #[tokio::test]
    async fn test_error_mapping() {
        let (store, ledger) = ledger();
        let user = UserId::new("u1");

        let err = ledger.reserve(&user, 4).await.unwrap_err();
        assert!(matches!(err, LedgerError::QuotaExceeded { used: 0, limit: 3 }));
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        *store.offline.lock() = true;
        let err = ledger.reserve(&user, 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::Common(CommonError::Backend { .. })));
        assert!(!err.is_retryable());
    }
}
