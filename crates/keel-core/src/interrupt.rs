//! Cooperative cancellation of the active test flow
//!
//! An [`InterruptHandle`] is created once per invocation and passed by value
//! into whichever flow runs. The OS signal listener in the CLI is only one
//! producer of interrupts; tests call [`InterruptHandle::interrupt`] directly.

use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Reason for an interruption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// User pressed Ctrl+C
    UserInterrupt,
    /// Cancelled programmatically
    Manual,
}

/// Shared cancellation state for one invocation
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    token: CancellationToken,
    reason: Arc<OnceLock<InterruptReason>>,
}

impl InterruptHandle {
    /// Create a handle that has not been interrupted
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the active flow.
    ///
    /// Returns `true` for the interrupt that actually cancelled; later calls
    /// have no further effect and return `false`.
    pub fn interrupt(&self, reason: InterruptReason) -> bool {
        if self.reason.set(reason).is_err() {
            tracing::debug!(?reason, "ignoring repeated interrupt");
            return false;
        }
        tracing::debug!(?reason, "interrupting active flow");
        self.token.cancel();
        true
    }

    /// Reason recorded by the first interrupt
    pub fn reason(&self) -> Option<InterruptReason> {
        self.reason.get().copied()
    }

    /// Token handed to daemon calls so they can observe cancellation
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
