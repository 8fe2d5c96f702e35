//! Port interfaces for outcome listeners

use async_trait::async_trait;

use super::outcome::OutcomeEvent;

/// Listener notified once with the final outcome of every run
///
/// Sinks cannot fail a run; adapters log their own delivery errors.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn on_outcome(&self, event: &OutcomeEvent);
}
