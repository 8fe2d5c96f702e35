//! Per-operation cooldown tracking

pub mod ledger;

pub use ledger::RateLimitLedger;
