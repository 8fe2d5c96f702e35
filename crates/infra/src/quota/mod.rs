//! Quota store adapters

pub mod memory;

pub use memory::{InMemoryQuotaStore, StoreStats};
