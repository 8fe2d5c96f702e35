//! Configuration loader
//!
//! Loads application configuration from files and environment variables.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file into the process environment, if one exists
//! 2. Probes for a config file; falls back to defaults when none is found
//! 3. Applies `METERGUARD_*` environment overrides on top
//! 4. Validates the result
//!
//! ## Environment Variables
//! - `METERGUARD_MAX_RETRIES`: Maximum attempts per run
//! - `METERGUARD_INITIAL_BACKOFF_MS`: First backoff delay in milliseconds
//! - `METERGUARD_MAX_BACKOFF_MS`: Cap on a single backoff delay in
//!   milliseconds
//! - `METERGUARD_RATE_LIMIT_COOLDOWN_SECS`: Cooldown after exhausted retries
//! - `METERGUARD_MONTHLY_LIMIT`: Default monthly quota for new accounts
//! - `METERGUARD_LOG_LEVEL`: Default tracing filter directive
//! - `METERGUARD_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./meterguard.toml`, `./meterguard.json`, `./config.toml`,
//!    `./config.json` (current working directory)
//! 2. The same names in the parent and grandparent directories
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use meterguard_domain::{AppConfig, MeterGuardError, Result};

const ENV_MAX_RETRIES: &str = "METERGUARD_MAX_RETRIES";
const ENV_INITIAL_BACKOFF_MS: &str = "METERGUARD_INITIAL_BACKOFF_MS";
const ENV_MAX_BACKOFF_MS: &str = "METERGUARD_MAX_BACKOFF_MS";
const ENV_RATE_LIMIT_COOLDOWN_SECS: &str = "METERGUARD_RATE_LIMIT_COOLDOWN_SECS";
const ENV_MONTHLY_LIMIT: &str = "METERGUARD_MONTHLY_LIMIT";
const ENV_LOG_LEVEL: &str = "METERGUARD_LOG_LEVEL";
const ENV_LOG_JSON: &str = "METERGUARD_LOG_JSON";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["meterguard.toml", "meterguard.json", "config.toml", "config.json"];

/// Load configuration with the full layering strategy
///
/// # Errors
/// Returns `MeterGuardError::Config` if:
/// - A config file exists but cannot be read or parsed
/// - An environment override is malformed
/// - The merged configuration fails validation
pub fn load() -> Result<AppConfig> {
    load_dotenv();

    let base = match discover_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            AppConfig::default()
        }
    };

    let config = apply_env_overrides(base)?;
    config.validate()?;
    tracing::info!(
        max_retries = config.orchestrator.max_retries,
        monthly_limit = config.quota.monthly_limit,
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration from defaults plus environment variables only
///
/// # Errors
/// Returns `MeterGuardError::Config` if a variable has an invalid value or
/// the result fails validation.
pub fn load_from_env() -> Result<AppConfig> {
    let config = apply_env_overrides(AppConfig::default())?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Missing sections and keys take their default values.
///
/// # Errors
/// Returns `MeterGuardError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MeterGuardError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => discover_config_paths().ok_or_else(|| {
            MeterGuardError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MeterGuardError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MeterGuardError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MeterGuardError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(MeterGuardError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn discover_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
        roots.push(cwd.join("../.."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
            roots.push(exe_dir.join(".."));
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Apply `METERGUARD_*` process environment overrides
///
/// # Errors
/// Returns `MeterGuardError::Config` if a variable is set but malformed.
pub fn apply_env_overrides(config: AppConfig) -> Result<AppConfig> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using an arbitrary variable lookup
///
/// # Errors
/// Returns `MeterGuardError::Config` if a variable is set but malformed.
pub fn apply_overrides_from<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(max_retries) = parse_var::<u32, _>(&lookup, ENV_MAX_RETRIES)? {
        config.orchestrator.max_retries = max_retries;
    }
    if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_INITIAL_BACKOFF_MS)? {
        config.orchestrator.initial_backoff = Duration::from_millis(ms);
    }
    if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_MAX_BACKOFF_MS)? {
        config.orchestrator.max_backoff = Some(Duration::from_millis(ms));
    }
    if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_RATE_LIMIT_COOLDOWN_SECS)? {
        config.orchestrator.rate_limit_cooldown = Duration::from_secs(secs);
    }
    if let Some(limit) = parse_var::<u32, _>(&lookup, ENV_MONTHLY_LIMIT)? {
        config.quota.monthly_limit = limit;
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    if let Some(json) = parse_bool(&lookup, ENV_LOG_JSON)? {
        config.logging.json = json;
    }
    Ok(config)
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }
}

/// Parse an optional numeric variable
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| MeterGuardError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse an optional boolean variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => {
                Err(MeterGuardError::Config(format!("Invalid boolean for {key}: {other}")))
            }
        })
        .transpose()
}
