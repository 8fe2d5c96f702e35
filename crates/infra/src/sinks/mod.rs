//! Outcome sink adapters

pub mod broadcast;
pub mod tracing_sink;

pub use broadcast::BroadcastSink;
pub use tracing_sink::TracingSink;
