//! Plan generation boundary.
//!
//! Turning a natural-language task into an [`ExecutionPlan`] is delegated to an external
//! generator. The core only bounds it with a deadline and rejects unusable answers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::{NavflowError, Result, model::ExecutionPlan};

/// Produces an execution plan for a task prompt.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Generates a plan.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The task description.
    /// * `context` - Free-form context (available nodes, device model, ...) as a JSON object.
    async fn generate(
        &self,
        prompt: &str,
        context: &Value,
    ) -> Result<ExecutionPlan>;
}

/// Runs `generator` under `deadline`.
///
/// Expiry is `PlanGenerationTimeout`; generator errors and infeasible plans are
/// `PlanGenerationFailed`. No partial plan is ever returned.
pub(crate) async fn generate_plan(
    generator: &dyn PlanGenerator,
    prompt: &str,
    context: &Value,
    deadline: Duration,
) -> Result<ExecutionPlan> {
    info!("generating plan (deadline {}ms)", deadline.as_millis());
    match tokio::time::timeout(deadline, generator.generate(prompt, context)).await {
        Err(_) => {
            warn!("plan generation timed out after {}ms", deadline.as_millis());
            Err(NavflowError::PlanGenerationTimeout(deadline.as_millis() as u64))
        }
        Ok(Err(err @ NavflowError::PlanGenerationFailed(_))) => Err(err),
        Ok(Err(err)) => Err(NavflowError::PlanGenerationFailed(err.to_string())),
        Ok(Ok(plan)) if !plan.feasible => Err(NavflowError::PlanGenerationFailed(format!("task not feasible: {}", plan.analysis))),
        Ok(Ok(plan)) => {
            info!("plan generated with {} steps", plan.steps.len());
            Ok(plan)
        }
    }
}
