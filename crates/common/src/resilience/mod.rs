//! Resilience primitives shared by the orchestration layer
//!
//! This module provides **generic, reusable** building blocks:
//! - **Clock**: time abstraction so cooldown expiry and quota cycles can be
//!   tested deterministically with [`MockClock`]
//! - **Backoff**: exponential delay arithmetic with overflow-safe caps
//!
//! Domain policy (which errors retry, how long a key cools down) lives in
//! `meterguard-core`; nothing here knows about quotas or operation keys.

pub mod backoff;
pub mod clock;

pub use backoff::ExponentialBackoff;
pub use clock::{Clock, MockClock, SystemClock};
