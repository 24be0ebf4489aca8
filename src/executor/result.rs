use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, EnumString};

use crate::{
    ErrorKind, NavflowError,
    model::ActionType,
    pathfinder::{Transition, TransitionKind},
    tree::Position,
};

/// Escalation phase an action ran in.
#[derive(AsRefStr, EnumString, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionPhase {
    Main,
    Retry,
    Failure,
}

/// One invocation of an action.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IterationResult {
    /// 1-based
    pub iteration: u32,
    pub success: bool,
    pub message: Option<String>,
    pub execution_time_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub command: String,
    pub phase: ActionPhase,
    /// channel kind the action was routed to
    pub channel: ActionType,
    pub success: bool,
    pub iterations: Vec<IterationResult>,
    /// message of the failing iteration, if any
    pub message: Option<String>,
    pub execution_time_ms: u64,
}

/// Outcome of a main/retry/failure action batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionBatchResult {
    pub success: bool,
    pub total_count: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    /// every attempted action across all phases, in execution order
    pub results: Vec<ActionResult>,
    /// commands of the failed actions
    pub error_summary: Option<String>,
    pub execution_time_ms: u64,
}

impl ActionBatchResult {
    pub(crate) fn new(
        success: bool,
        results: Vec<ActionResult>,
        execution_time_ms: u64,
    ) -> Self {
        let passed_count = results.iter().filter(|r| r.success).count();
        let failed: Vec<&str> = results.iter().filter(|r| !r.success).map(|r| r.command.as_str()).collect();
        let error_summary = if failed.is_empty() {
            None
        } else {
            Some(format!("failed actions: {}", failed.join(", ")))
        };

        Self {
            success,
            total_count: results.len(),
            passed_count,
            failed_count: failed.len(),
            results,
            error_summary,
            execution_time_ms,
        }
    }

    pub fn phase(
        &self,
        phase: ActionPhase,
    ) -> impl Iterator<Item = &ActionResult> {
        self.results.iter().filter(move |r| r.phase == phase)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerificationResult {
    /// `type:command` of the verification
    pub verification: String,
    pub success: bool,
    pub message: Option<String>,
    pub details: Value,
    pub execution_time_ms: u64,
}

/// Error attached to a failed transition, path or step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&NavflowError> for StepError {
    fn from(err: &NavflowError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<NavflowError> for StepError {
    fn from(err: NavflowError) -> Self {
        StepError::from(&err)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub kind: TransitionKind,
    pub tree_id: String,
    pub edge_id: String,
    pub action_set_id: String,
    pub from_node_id: String,
    pub to_node_id: String,
    pub from_node_label: String,
    pub to_node_label: String,

    pub success: bool,
    /// `None` for virtual transitions
    pub action_result: Option<ActionBatchResult>,
    pub verification_results: Vec<VerificationResult>,
    pub error: Option<StepError>,
    pub execution_time_ms: u64,
    /// screenshot references taken before and after, when enabled
    pub screenshots: Vec<String>,
}

impl TransitionResult {
    pub(crate) fn start(transition: &Transition) -> Self {
        Self {
            kind: transition.kind,
            tree_id: transition.tree_id.clone(),
            edge_id: transition.edge_id.clone(),
            action_set_id: transition.action_set_id.clone(),
            from_node_id: transition.from_node_id.clone(),
            to_node_id: transition.to_node_id.clone(),
            from_node_label: transition.from_node_label.clone(),
            to_node_label: transition.to_node_label.clone(),
            success: false,
            action_result: None,
            verification_results: Vec::new(),
            error: None,
            execution_time_ms: 0,
            screenshots: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PathResult {
    pub success: bool,
    pub transitions_completed: usize,
    pub total_transitions: usize,
    pub results: Vec<TransitionResult>,
    pub error: Option<StepError>,
    /// position after the last completed transition
    pub final_node: Option<Position>,
}
