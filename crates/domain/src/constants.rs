//! Domain constants
//!
//! Defaults for the orchestrator and quota configuration.

use std::time::Duration;

// Retry policy
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

// Cooldown opened after retries are exhausted on a retriable class
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

// Quota
pub const DEFAULT_MONTHLY_LIMIT: u32 = 100;

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Operation key prefixes
pub const OPERATION_GENERATE: &str = "generate";
pub const OPERATION_TUNE: &str = "tune";
pub const OPERATION_ANALYZE: &str = "analyze";
pub const OPERATION_KEY_SEPARATOR: char = ':';
