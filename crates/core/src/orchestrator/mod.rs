//! Reserve, execute, retry and refund coordination

pub mod context;
pub mod outcome;
pub mod ports;
pub mod service;

pub use context::RunContext;
pub use outcome::{Outcome, OutcomeEvent, RefundWarning, RunError, RunMetrics};
pub use ports::OutcomeSink;
pub use service::{CallOrchestrator, OrchestratorStats};
