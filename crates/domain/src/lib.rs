//! # MeterGuard Domain
//!
//! Domain types and models for the metered retry orchestrator.
//!
//! This crate contains:
//! - Quota accounts and operation keys
//! - The upstream error model and its classification
//! - Domain error types and Result definitions
//! - Configuration structures and defaults
//!
//! ## Architecture
//! - No dependencies on other MeterGuard crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
