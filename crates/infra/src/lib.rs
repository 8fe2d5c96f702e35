//! # MeterGuard Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - An in-memory transactional quota store
//! - Outcome sinks (structured log, broadcast fan-out)
//! - Configuration loading (env, `.env`, TOML/JSON files)
//! - Tracing subscriber setup
//! - Orchestrator bootstrap
//!
//! ## Architecture
//! - Implements traits defined in `meterguard-core`
//! - Contains all "impure" code (I/O, global subscriber, background tasks)

pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod quota;
pub mod sinks;

// Re-export commonly used items
pub use bootstrap::{build_orchestrator, start, Services};
pub use observability::init_tracing;
pub use quota::{InMemoryQuotaStore, StoreStats};
pub use sinks::{BroadcastSink, TracingSink};
