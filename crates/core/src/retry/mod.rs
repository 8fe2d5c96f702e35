//! Retry eligibility and backoff delays

pub mod policy;

pub use policy::BackoffPolicy;
