//! Outcome sink that writes one structured log record per run

use async_trait::async_trait;
use meterguard_common::ErrorClassification;
use meterguard_core::{OutcomeEvent, OutcomeSink};
use tracing::{info, warn};

/// Logs every run outcome through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutcomeSink for TracingSink {
    async fn on_outcome(&self, event: &OutcomeEvent) {
        let metrics = &event.metrics;
        match &event.error {
            None => info!(
                key = %event.key,
                user = %event.user_id,
                attempts = metrics.attempts,
                reservations = metrics.reservations,
                refunds = metrics.refunds,
                backoff_ms = metrics.total_backoff.as_millis() as u64,
                "metered run succeeded"
            ),
            Some(error) => warn!(
                key = %event.key,
                user = %event.user_id,
                error = %error,
                severity = %error.severity(),
                rate_limited = event.rate_limited,
                retry_after = ?event.retry_after,
                attempts = metrics.attempts,
                refunds_failed = metrics.refunds_failed,
                "metered run failed"
            ),
        }

        for warning in &event.refund_warnings {
            warn!(
                key = %event.key,
                user = %event.user_id,
                attempt = warning.attempt,
                cost = warning.cost,
                token = %warning.token,
                reason = %warning.reason,
                "refund failed, quota left debited"
            );
        }
    }
}
