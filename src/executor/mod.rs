//! Device-side execution: action batches and navigation paths.

mod action;
mod navigation;
mod result;

use std::time::Duration;

pub use action::ActionExecutor;
pub use navigation::NavigationExecutor;
pub use result::{ActionBatchResult, ActionPhase, ActionResult, IterationResult, PathResult, StepError, TransitionResult, VerificationResult};

pub(crate) async fn sleep_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
