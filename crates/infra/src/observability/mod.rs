//! Tracing subscriber setup
//!
//! Installs a global `tracing-subscriber` registry with an [`EnvFilter`].
//! `RUST_LOG` wins over the configured level when it is set and valid.

use meterguard_domain::{LoggingConfig, MeterGuardError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber
///
/// # Errors
/// Returns `MeterGuardError::Config` for an unparsable level and
/// `MeterGuardError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    installed.map_err(|e| MeterGuardError::Internal(format!("Tracing already initialised: {e}")))
}

/// Filter from `RUST_LOG`, falling back to `default_level`
///
/// # Errors
/// Returns `MeterGuardError::Config` if `default_level` is not a valid
/// filter directive.
pub fn build_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level).map_err(|e| {
            MeterGuardError::Config(format!("Invalid log level '{default_level}': {e}"))
        }),
    }
}
