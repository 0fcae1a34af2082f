use crate::errors::TaskError;

// @module: Cooperative cancellation

/// The orchestrator creates a fresh token for every task, so a cancel never
/// outlives the task it was meant for.
pub use tokio_util::sync::CancellationToken;

/// Check points over a `CancellationToken`.
///
/// Cancelling never interrupts an in-flight call; stages poll the token at
/// their check points through `check`.
pub trait CancellationCheck {
    fn check(&self) -> Result<(), TaskError>;
}

impl CancellationCheck for CancellationToken {
    // @checks: Cancellation at a check point
    fn check(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::UserCancelled)
        } else {
            Ok(())
        }
    }
}
