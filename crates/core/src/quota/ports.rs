//! Port interfaces for quota storage
//!
//! The store is the source of truth for usage. It must apply
//! [`QuotaStore::increment_usage`] atomically against the ceiling; the
//! ledger performs no locking of its own.

use async_trait::async_trait;
use meterguard_domain::{QuotaAccount, UserId};
use thiserror::Error;
use uuid::Uuid;

/// Errors reported by a quota store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaStoreError {
    /// The increment would exceed the ceiling; nothing was mutated
    #[error("quota exceeded ({used}/{limit} used)")]
    QuotaExceeded { limit: u32, used: u32 },

    /// The store could not be reached or gave an ambiguous answer
    #[error("quota store unavailable: {message}")]
    Unavailable { message: String },
}

impl QuotaStoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }
}

/// Transactional per-user usage counter
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Add `amount` to the user's usage if the result stays within the limit
    ///
    /// Returns the units remaining after the increment. `token` identifies
    /// the reservation so a later refund can be deduplicated.
    async fn increment_usage(
        &self,
        user: &UserId,
        amount: u32,
        token: Uuid,
    ) -> Result<u32, QuotaStoreError>;

    /// Subtract `amount` from the user's usage, floored at zero
    ///
    /// Delivering the same `token` twice must not refund twice.
    async fn refund(&self, user: &UserId, amount: u32, token: Uuid) -> Result<(), QuotaStoreError>;

    /// Current account state, creating it if the user is new
    async fn account(&self, user: &UserId) -> Result<QuotaAccount, QuotaStoreError>;
}
