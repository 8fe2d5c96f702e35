//! # MeterGuard Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the quota store and outcome listeners
//! - Error classification and backoff policy
//! - The rate limit ledger and quota ledger client
//! - The call orchestrator state machine
//!
//! ## Architecture Principles
//! - Only depends on `meterguard-common` and `meterguard-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod classification;
pub mod orchestrator;
pub mod quota;
pub mod rate_limit;
pub mod retry;

pub use classification::{classify, DefaultClassifier, ErrorClassifier};
pub use orchestrator::{
    CallOrchestrator, OrchestratorStats, Outcome, OutcomeEvent, OutcomeSink, RefundWarning,
    RunContext, RunError, RunMetrics,
};
pub use quota::{LedgerError, QuotaLedger, QuotaStore, QuotaStoreError, Reservation};
pub use rate_limit::RateLimitLedger;
pub use retry::BackoffPolicy;
