//! Configuration structures
//!
//! Durations are serialized as integer milliseconds (`*_ms` keys) so the same
//! shape works in TOML, JSON and environment overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INITIAL_BACKOFF, DEFAULT_LOG_LEVEL, DEFAULT_MAX_RETRIES, DEFAULT_MONTHLY_LIMIT,
    DEFAULT_RATE_LIMIT_COOLDOWN,
};
use crate::errors::{MeterGuardError, Result};
use crate::utils::{duration_millis, option_duration_millis};

/// Retry, backoff and cooldown policy for the call orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum attempts per run, including the first
    pub max_retries: u32,
    /// Delay after the first failed attempt; doubles per attempt
    #[serde(rename = "initial_backoff_ms", with = "duration_millis")]
    pub initial_backoff: Duration,
    /// Optional cap on a single backoff sleep; uncapped by default
    #[serde(
        rename = "max_backoff_ms",
        with = "option_duration_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_backoff: Option<Duration>,
    /// Cooldown opened for a key once retries are exhausted
    #[serde(rename = "rate_limit_cooldown_ms", with = "duration_millis")]
    pub rate_limit_cooldown: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: None,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
        }
    }
}

impl OrchestratorConfig {
    /// Create a configuration builder
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(MeterGuardError::Config("max_retries must be at least 1".to_string()));
        }

        if self.initial_backoff.is_zero() {
            return Err(MeterGuardError::Config(
                "initial_backoff must be greater than 0".to_string(),
            ));
        }

        if let Some(max_backoff) = self.max_backoff {
            if self.initial_backoff > max_backoff {
                return Err(MeterGuardError::Config(format!(
                    "initial_backoff ({:?}) cannot be greater than max_backoff ({:?})",
                    self.initial_backoff, max_backoff
                )));
            }
        }

        if self.rate_limit_cooldown.is_zero() {
            return Err(MeterGuardError::Config(
                "rate_limit_cooldown must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for OrchestratorConfig
#[derive(Debug, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    pub fn new() -> Self {
        Self { config: OrchestratorConfig::default() }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.config.initial_backoff = delay;
        self
    }

    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.config.max_backoff = Some(delay);
        self
    }

    pub fn rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.rate_limit_cooldown = cooldown;
        self
    }

    pub fn build(self) -> Result<OrchestratorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Quota defaults applied to newly created accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub monthly_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { monthly_limit: DEFAULT_MONTHLY_LIMIT }
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub orchestrator: OrchestratorConfig,
    pub quota: QuotaConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.orchestrator.validate()?;

        if self.logging.level.trim().is_empty() {
            return Err(MeterGuardError::Config("logging.level must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates the documented defaults.
    ///
    /// Assertions:
    /// - Confirms 3 retries, 1s initial backoff, no cap, 60s cooldown.
    /// - Confirms a 100-unit monthly limit and `info` logging.
    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.orchestrator.max_retries, 3);
        assert_eq!(config.orchestrator.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.orchestrator.max_backoff, None);
        assert_eq!(config.orchestrator.rate_limit_cooldown, Duration::from_secs(60));
        assert_eq!(config.quota.monthly_limit, 100);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.validate().is_ok());
    }

    /// Validates builder validation failures.
    ///
    /// Assertions:
    /// - Ensures zero retries are rejected.
    /// - Ensures an initial backoff above an explicit cap is rejected.
    /// - Ensures a zero cooldown is rejected.
    #[test]
    fn test_builder_rejects_invalid() {
        assert!(OrchestratorConfig::builder().max_retries(0).build().is_err());
        assert!(OrchestratorConfig::builder()
            .initial_backoff(Duration::from_secs(40))
            .max_backoff(Duration::from_secs(30))
            .build()
            .is_err());
        assert!(OrchestratorConfig::builder().rate_limit_cooldown(Duration::ZERO).build().is_err());

        let config = OrchestratorConfig::builder()
            .max_retries(5)
            .initial_backoff(Duration::from_millis(200))
            .max_backoff(Duration::from_secs(2))
            .build()
            .unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_backoff, Some(Duration::from_secs(2)));
    }

    /// Validates long initial delays are accepted when no cap is set.
    ///
    /// Assertions:
    /// - Confirms a 45s initial backoff builds.
    /// - Confirms the cap stays unset and is omitted when serialized.
    #[test]
    fn test_long_initial_backoff_without_cap() {
        let config =
            OrchestratorConfig::builder().initial_backoff(Duration::from_secs(45)).build().unwrap();
        assert_eq!(config.initial_backoff, Duration::from_secs(45));
        assert_eq!(config.max_backoff, None);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["initial_backoff_ms"], 45_000);
        assert!(json.get("max_backoff_ms").is_none());
    }

    /// Validates partial documents fall back to defaults per field.
    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"orchestrator": {"max_retries": 5, "rate_limit_cooldown_ms": 120000}}"#,
        )
        .unwrap();
        assert_eq!(config.orchestrator.max_retries, 5);
        assert_eq!(config.orchestrator.rate_limit_cooldown, Duration::from_secs(120));
        assert_eq!(config.orchestrator.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.quota.monthly_limit, 100);
    }

    #[test]
    fn test_empty_log_level_rejected() {
        let mut config = AppConfig::default();
        config.logging.level = " ".to_string();
        assert!(matches!(config.validate(), Err(MeterGuardError::Config(_))));
    }
}
