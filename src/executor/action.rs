//! Ordered action execution with iteration and main/retry/failure escalation.

use std::{sync::Arc, time::Instant};

use tracing::debug;

use crate::{
    device::{Device, classify},
    events::ExecutionEvent,
    executor::{ActionBatchResult, ActionPhase, ActionResult, IterationResult, sleep_ms},
    metrics::ActionExecution,
    model::{Action, ActionType, Verification},
    runtime::Context,
    utils,
};

/// Runs actions on one device.
///
/// Never fails as a whole: channel faults and missing channels are recorded as failed
/// iterations and surface through the result structs.
pub struct ActionExecutor {
    device: Device,
    ctx: Arc<Context>,
}

impl ActionExecutor {
    pub fn new(
        device: Device,
        ctx: Arc<Context>,
    ) -> Self {
        Self {
            device,
            ctx,
        }
    }

    /// Runs `actions`, escalating to `retry_actions` and then `failure_actions`.
    ///
    /// The batch succeeds when every main action succeeds, or when main failed and a
    /// non-empty retry list fully succeeded. Failure actions are cleanup only and never
    /// change the outcome.
    pub async fn execute_actions(
        &self,
        actions: &[Action],
        retry_actions: &[Action],
        failure_actions: &[Action],
    ) -> ActionBatchResult {
        let start = Instant::now();
        let mut results = Vec::new();

        let main_ok = self.run_phase(ActionPhase::Main, actions, &mut results).await;
        let mut success = main_ok;

        if !main_ok {
            let retry_ok = if retry_actions.is_empty() {
                false
            } else {
                debug!("main actions failed, running {} retry actions", retry_actions.len());
                self.run_phase(ActionPhase::Retry, retry_actions, &mut results).await
            };
            success = retry_ok;

            if !retry_ok && !failure_actions.is_empty() {
                debug!("escalating to {} failure actions", failure_actions.len());
                self.run_phase(ActionPhase::Failure, failure_actions, &mut results).await;
            }
        }

        ActionBatchResult::new(success, results, utils::time::elapsed_millis(start))
    }

    /// Runs actions in order until one fails; returns whether all succeeded.
    async fn run_phase(
        &self,
        phase: ActionPhase,
        actions: &[Action],
        results: &mut Vec<ActionResult>,
    ) -> bool {
        for action in actions {
            let result = self.execute_action(action, phase).await;
            let ok = result.success;
            results.push(result);
            if !ok {
                return false;
            }
        }
        true
    }

    /// Executes one action with all of its iterations.
    pub async fn execute_action(
        &self,
        action: &Action,
        phase: ActionPhase,
    ) -> ActionResult {
        let kind = classify(&action.command, action.action_type, &self.device);
        let count = action.iteration_count(kind);
        let wait_ms = action.wait_time_ms();
        let start = Instant::now();

        let mut iterations = Vec::with_capacity(count as usize);
        for iteration in 1..=count {
            let iteration_start = Instant::now();
            let (success, message) = self.invoke(kind, action).await;
            debug!("{} [{}] iteration {}/{}: {}", action.command, kind.as_ref(), iteration, count, if success { "ok" } else { "failed" });

            iterations.push(IterationResult {
                iteration,
                success,
                message,
                execution_time_ms: utils::time::elapsed_millis(iteration_start),
            });
            if !success {
                break;
            }
            if iteration < count {
                sleep_ms(wait_ms).await;
            }
        }

        let success = iterations.len() == count as usize && iterations.iter().all(|i| i.success);
        if success {
            // settle after the last iteration
            sleep_ms(wait_ms).await;
        }

        let result = ActionResult {
            command: action.command.clone(),
            phase,
            channel: kind,
            success,
            message: iterations.iter().rev().find(|i| !i.success).and_then(|i| i.message.clone()),
            iterations,
            execution_time_ms: utils::time::elapsed_millis(start),
        };

        self.ctx.emit(ExecutionEvent::Action(ActionExecution {
            id: String::new(),
            run_id: self.ctx.run_id(),
            device_id: self.device.id().to_string(),
            command: action.command.clone(),
            params: action.params.clone(),
            channel: kind,
            success: result.success,
            iterations: result.iterations.len() as u32,
            execution_time_ms: result.execution_time_ms,
            message: result.message.clone(),
            timestamp: utils::time::time_millis(),
        }));

        result
    }

    async fn invoke(
        &self,
        kind: ActionType,
        action: &Action,
    ) -> (bool, Option<String>) {
        if kind == ActionType::Verification {
            let Some(verifier) = self.device.verifier() else {
                return (false, Some(format!("no verification backend on device {}", self.device.id())));
            };
            return match verifier.evaluate(&Verification::from_action(action)).await {
                Ok(output) => (output.success, output.message),
                Err(err) => (false, Some(err.to_string())),
            };
        }

        let Some(channel) = self.device.channel(kind) else {
            return (false, Some(format!("no {} channel on device {}", kind.as_ref(), self.device.id())));
        };
        match channel.invoke(&action.command, &action.params).await {
            Ok(output) => (output.success, output.message),
            Err(err) => (false, Some(err.to_string())),
        }
    }
}
