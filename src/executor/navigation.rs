//! Transition and path execution with destination verification gating.

use std::{sync::Arc, time::Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    ErrorKind,
    device::Device,
    events::ExecutionEvent,
    executor::{ActionExecutor, PathResult, StepError, TransitionResult, VerificationResult, sleep_ms},
    metrics::{EdgeExecution, NodeExecution},
    model::{ActionType, Verification},
    pathfinder::Transition,
    runtime::Context,
    utils,
};

/// Drives a device along navigation transitions.
pub struct NavigationExecutor {
    device: Device,
    ctx: Arc<Context>,
    actions: ActionExecutor,
    capture_screenshots: bool,
}

impl NavigationExecutor {
    pub fn new(
        device: Device,
        ctx: Arc<Context>,
    ) -> Self {
        Self {
            actions: ActionExecutor::new(device.clone(), ctx.clone()),
            device,
            ctx,
            capture_screenshots: false,
        }
    }

    /// Take best-effort screenshots before and after every transition.
    pub fn with_screenshots(
        mut self,
        enabled: bool,
    ) -> Self {
        self.capture_screenshots = enabled;
        self
    }

    /// Executes transitions in order, stopping at the first failure.
    pub async fn execute_path(
        &self,
        path: &[Transition],
    ) -> PathResult {
        info!("device {}: executing path of {} transitions", self.device.id(), path.len());
        let mut result = PathResult {
            success: true,
            transitions_completed: 0,
            total_transitions: path.len(),
            results: Vec::with_capacity(path.len()),
            error: None,
            final_node: None,
        };

        for transition in path {
            let outcome = self.execute_transition(transition).await;
            let ok = outcome.success;
            let error = outcome.error.clone();
            result.results.push(outcome);

            if !ok {
                result.success = false;
                result.error = error;
                break;
            }
            result.transitions_completed += 1;
            result.final_node = Some(transition.destination());
        }

        result
    }

    /// Executes one transition: actions, edge metric, settle wait, then verifications.
    pub async fn execute_transition(
        &self,
        transition: &Transition,
    ) -> TransitionResult {
        let start = Instant::now();
        let mut result = TransitionResult::start(transition);

        if transition.is_virtual() {
            debug!("{} {} -> {}", transition.kind.as_ref(), transition.from_node_id, transition.to_node_id);
            result.success = true;
            return result;
        }

        debug!("transition {} -> {} via {}/{}", transition.from_node_label, transition.to_node_label, transition.edge_id, transition.action_set_id);
        self.screenshot(&mut result).await;

        let batch = self.actions.execute_actions(&transition.actions, &transition.retry_actions, &transition.failure_actions).await;
        let actions_ok = batch.success;
        let summary = batch.error_summary.clone();

        self.ctx.emit(ExecutionEvent::Edge(EdgeExecution {
            tree_id: transition.tree_id.clone(),
            edge_id: transition.edge_id.clone(),
            action_set_id: transition.action_set_id.clone(),
            success: actions_ok,
            execution_time_ms: batch.execution_time_ms,
            message: summary.clone(),
            timestamp: utils::time::time_millis(),
        }));
        result.action_result = Some(batch);

        if !actions_ok {
            result.error = Some(StepError::new(
                ErrorKind::ActionFailed,
                format!("{} -> {}: {}", transition.from_node_label, transition.to_node_label, summary.unwrap_or_else(|| "actions failed".to_string())),
            ));
            self.screenshot(&mut result).await;
            result.execution_time_ms = utils::time::elapsed_millis(start);
            return result;
        }

        sleep_ms(transition.final_wait_time).await;

        for verification in &transition.verifications {
            let outcome = self.verify(transition, verification).await;
            let passed = outcome.success;
            let message = outcome.message.clone();
            result.verification_results.push(outcome);

            if !passed {
                result.error = Some(StepError::new(
                    ErrorKind::VerificationFailed,
                    format!("{} on {}: {}", verification.describe(), transition.to_node_label, message.unwrap_or_else(|| "not verified".to_string())),
                ));
                break;
            }
        }

        result.success = result.error.is_none();
        self.screenshot(&mut result).await;
        result.execution_time_ms = utils::time::elapsed_millis(start);
        result
    }

    async fn verify(
        &self,
        transition: &Transition,
        verification: &Verification,
    ) -> VerificationResult {
        let start = Instant::now();
        let (success, message, details) = match self.device.verifier() {
            Some(verifier) => match verifier.evaluate(verification).await {
                Ok(output) => (output.success, output.message, output.details),
                Err(err) => (false, Some(err.to_string()), Value::Null),
            },
            None => (false, Some(format!("no verification backend on device {}", self.device.id())), Value::Null),
        };
        let execution_time_ms = utils::time::elapsed_millis(start);

        self.ctx.emit(ExecutionEvent::Node(NodeExecution {
            tree_id: transition.tree_id.clone(),
            node_id: transition.to_node_id.clone(),
            verification: verification.describe(),
            success,
            execution_time_ms,
            message: message.clone(),
            timestamp: utils::time::time_millis(),
        }));

        VerificationResult {
            verification: verification.describe(),
            success,
            message,
            details,
            execution_time_ms,
        }
    }

    async fn screenshot(
        &self,
        result: &mut TransitionResult,
    ) {
        if !self.capture_screenshots {
            return;
        }
        let Some(channel) = self.device.channel(ActionType::Remote) else {
            return;
        };
        match channel.screenshot().await {
            Ok(Some(shot)) => result.screenshots.push(shot),
            Ok(None) => {}
            Err(err) => warn!("screenshot failed on device {}: {}", self.device.id(), err),
        }
    }
}
