//! Run outcome types
//!
//! A run produces exactly one [`Outcome`]: either `data` or `error` is set.
//! `rate_limited` outcomes carry `retry_after` so callers can render a
//! countdown instead of a generic error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use meterguard_common::error::{ErrorClassification, ErrorSeverity};
use meterguard_domain::utils::duration_millis;
use meterguard_domain::{OperationKey, UpstreamCode, UserId};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Terminal error of a run
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunError {
    /// Credentials were rejected; the caller should refresh them
    #[error("credentials are invalid or expired")]
    AuthInvalid,

    #[error("request was rejected as invalid")]
    BadInput,

    #[error("monthly quota exhausted ({used}/{limit} used)")]
    QuotaExceeded { used: u32, limit: u32 },

    /// Reservation state is unknown, so the run was not attempted
    #[error("quota store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("upstream overloaded after {attempts} attempts")]
    Overloaded { attempts: u32 },

    #[error("rate limited until {retry_after}")]
    RateLimited { retry_after: DateTime<Utc> },

    /// Unclassified upstream failure
    #[error("internal error (upstream code {code})")]
    Internal { code: UpstreamCode },

    #[error("run cancelled")]
    Cancelled,
}

impl RunError {
    /// Time left until `retry_after`, measured from `now`
    ///
    /// Pass the orchestrator's clock reading (`rate_limits().now()`) so the
    /// countdown matches the clock the cooldown was opened with. Returns
    /// `None` for other variants and for cooldowns that have already ended.
    pub fn retry_after_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => (*retry_after - now).to_std().ok(),
            _ => None,
        }
    }
}

impl ErrorClassification for RunError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded { .. } | Self::RateLimited { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled => ErrorSeverity::Info,
            Self::QuotaExceeded { .. } | Self::Overloaded { .. } | Self::RateLimited { .. } => {
                ErrorSeverity::Warning
            }
            Self::AuthInvalid | Self::BadInput | Self::StoreUnavailable { .. } => {
                ErrorSeverity::Error
            }
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Time left until `retry_after`, measured against the system clock
    ///
    /// Use [`RunError::retry_after_at`] when the orchestrator runs on an
    /// injected clock.
    fn retry_after(&self) -> Option<Duration> {
        self.retry_after_at(Utc::now())
    }
}

/// Refund that failed and left a debit in place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundWarning {
    pub attempt: u32,
    pub cost: u32,
    pub token: Uuid,
    pub reason: String,
}

/// Counters for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    /// Upstream invocations started
    pub attempts: u32,
    /// Successful debits against the store
    pub reservations: u32,
    pub refunds: u32,
    pub refunds_failed: u32,
    /// Time spent in backoff sleeps
    #[serde(rename = "total_backoff_ms", with = "duration_millis")]
    pub total_backoff: Duration,
}

/// Final result of a run
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub data: Option<T>,
    pub error: Option<RunError>,
    pub rate_limited: bool,
    pub retry_after: Option<DateTime<Utc>>,
    pub refund_warnings: Vec<RefundWarning>,
    pub metrics: RunMetrics,
}

impl<T> Outcome<T> {
    pub fn succeeded(data: T, metrics: RunMetrics, refund_warnings: Vec<RefundWarning>) -> Self {
        Self {
            data: Some(data),
            error: None,
            rate_limited: false,
            retry_after: None,
            refund_warnings,
            metrics,
        }
    }

    pub fn failed(
        error: RunError,
        metrics: RunMetrics,
        refund_warnings: Vec<RefundWarning>,
    ) -> Self {
        Self {
            data: None,
            error: Some(error),
            rate_limited: false,
            retry_after: None,
            refund_warnings,
            metrics,
        }
    }

    pub fn limited(
        error: RunError,
        retry_after: DateTime<Utc>,
        metrics: RunMetrics,
        refund_warnings: Vec<RefundWarning>,
    ) -> Self {
        Self {
            data: None,
            error: Some(error),
            rate_limited: true,
            retry_after: Some(retry_after),
            refund_warnings,
            metrics,
        }
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some()
    }

    pub fn into_result(self) -> Result<T, RunError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => Err(RunError::Cancelled),
        }
    }

    /// Payload-free event describing this outcome
    pub fn event(
        &self,
        key: &OperationKey,
        user_id: &UserId,
        finished_at: DateTime<Utc>,
    ) -> OutcomeEvent {
        OutcomeEvent {
            key: key.clone(),
            user_id: user_id.clone(),
            succeeded: self.is_success(),
            error: self.error.clone(),
            rate_limited: self.rate_limited,
            retry_after: self.retry_after,
            refund_warnings: self.refund_warnings.clone(),
            metrics: self.metrics.clone(),
            finished_at,
        }
    }
}

/// Outcome delivered to sinks, without the result payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeEvent {
    pub key: OperationKey,
    pub user_id: UserId,
    pub succeeded: bool,
    pub error: Option<RunError>,
    pub rate_limited: bool,
    pub retry_after: Option<DateTime<Utc>>,
    pub refund_warnings: Vec<RefundWarning>,
    pub metrics: RunMetrics,
    pub finished_at: DateTime<Utc>,
}
