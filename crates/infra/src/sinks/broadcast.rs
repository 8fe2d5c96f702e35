//! Outcome sink that fans events out to in-process subscribers
//!
//! UI layers subscribe and render the latest outcome; gamification and
//! other listeners subscribe independently. Slow subscribers lag and lose
//! the oldest events rather than blocking runs.

use async_trait::async_trait;
use meterguard_core::{OutcomeEvent, OutcomeSink};
use tokio::sync::broadcast;
use tracing::debug;

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcast channel publisher for outcome events
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<OutcomeEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver for events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<OutcomeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl OutcomeSink for BroadcastSink {
    async fn on_outcome(&self, event: &OutcomeEvent) {
        if self.sender.send(event.clone()).is_err() {
            debug!(key = %event.key, "no outcome subscribers");
        }
    }
}
