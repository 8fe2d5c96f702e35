//! Per-run caller context

use meterguard_domain::UserId;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Identity and cancellation handle for one `run` call
#[derive(Debug, Clone)]
pub struct RunContext {
    user_id: UserId,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self::with_cancel(user_id, CancellationToken::new())
    }

    /// Context bound to an existing token, e.g. a child of a UI session token
    pub fn with_cancel(user_id: impl Into<UserId>, cancel: CancellationToken) -> Self {
        Self { user_id: user_id.into(), cancel }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Request cancellation of the run
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation is requested
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}
