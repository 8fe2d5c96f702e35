//! Orchestrator wiring
//!
//! [`build_orchestrator`] assembles a ready-to-use [`CallOrchestrator`] from
//! configuration. [`start`] additionally attaches a broadcast sink for UI
//! subscribers and runs the background cooldown sweeper until
//! [`Services::shutdown`] is called.

use std::sync::Arc;
use std::time::Duration;

use meterguard_core::{CallOrchestrator, QuotaStore};
use meterguard_domain::{AppConfig, MeterGuardError, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::sinks::{BroadcastSink, TracingSink};

/// Interval between background cooldown sweeps
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Build an orchestrator that logs every outcome
///
/// # Errors
/// Returns `MeterGuardError::Config` if the configuration is invalid.
pub fn build_orchestrator(
    config: &AppConfig,
    store: Arc<dyn QuotaStore>,
) -> Result<CallOrchestrator> {
    config.validate()?;
    let orchestrator = CallOrchestrator::new(config.orchestrator.clone(), store)?
        .with_sink(Arc::new(TracingSink::new()));
    Ok(orchestrator)
}

/// Running orchestrator with its event channel and sweeper
pub struct Services {
    pub orchestrator: Arc<CallOrchestrator>,
    pub events: BroadcastSink,
    shutdown: CancellationToken,
    sweeper: JoinHandle<()>,
}

impl Services {
    /// Stop the background sweeper and wait for it to exit
    ///
    /// # Errors
    /// Returns `MeterGuardError::Internal` if the sweeper task panicked.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();
        self.sweeper
            .await
            .map_err(|e| MeterGuardError::Internal(format!("Cooldown sweeper failed: {e}")))?;
        info!("metered orchestrator stopped");
        Ok(())
    }
}

/// Build the orchestrator, attach a broadcast sink and start the sweeper
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
/// Returns `MeterGuardError::Config` if the configuration is invalid.
pub fn start(config: &AppConfig, store: Arc<dyn QuotaStore>) -> Result<Services> {
    let events = BroadcastSink::default();
    let orchestrator =
        Arc::new(build_orchestrator(config, store)?.with_sink(Arc::new(events.clone())));

    let shutdown = CancellationToken::new();
    let sweeper = Arc::clone(orchestrator.rate_limits())
        .spawn_sweeper(SWEEP_INTERVAL, shutdown.child_token());

    info!(
        max_retries = config.orchestrator.max_retries,
        cooldown_secs = config.orchestrator.rate_limit_cooldown.as_secs(),
        "metered orchestrator started"
    );
    Ok(Services { orchestrator, events, shutdown, sweeper })
}
