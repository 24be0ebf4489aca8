//! Plan orchestration.
//!
//! The dispatcher runs an [`ExecutionPlan`](crate::ExecutionPlan) step by step on one
//! device, records every step into the run status and decides the final run state.

mod dispatcher;
mod navigator;

use serde::{Deserialize, Serialize};

use crate::{
    executor::{ActionBatchResult, PathResult, StepError},
    model::StepType,
    runtime::RunId,
    store::RunState,
};

pub(crate) use dispatcher::Dispatcher;
pub(crate) use navigator::Navigator;

/// How a plan run is driven by its caller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionMode {
    /// Await the run and return its report.
    #[default]
    Sync,
    /// Spawn the run and return its id; status is polled.
    Async,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExecutionOptions {
    /// skip the remaining steps after the first failed one
    pub stop_on_first_error: bool,
    pub mode: ExecutionMode,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            stop_on_first_error: true,
            mode: ExecutionMode::Sync,
        }
    }
}

impl ExecutionOptions {
    pub fn asynchronous() -> Self {
        Self {
            mode: ExecutionMode::Async,
            ..Self::default()
        }
    }

    pub fn with_stop_on_first_error(
        mut self,
        stop: bool,
    ) -> Self {
        self.stop_on_first_error = stop;
        self
    }
}

/// Outcome of starting a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanExecution {
    Completed(PlanReport),
    Started(RunId),
}

impl PlanExecution {
    pub fn run_id(&self) -> &str {
        match self {
            PlanExecution::Completed(report) => &report.run_id,
            PlanExecution::Started(run_id) => run_id,
        }
    }

    /// The report of a synchronous run.
    pub fn report(self) -> Option<PlanReport> {
        match self {
            PlanExecution::Completed(report) => Some(report),
            PlanExecution::Started(_) => None,
        }
    }
}

/// Result of one executed plan step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepResult {
    /// zero-based position in the plan
    pub index: usize,
    pub step_type: StepType,
    pub command: String,
    pub description: String,
    pub success: bool,
    pub error: Option<StepError>,
    /// set for navigation steps that reached execution
    pub path: Option<PathResult>,
    /// set for action and verification steps
    pub actions: Option<ActionBatchResult>,
    pub execution_time_ms: u64,
}

/// Final report of a plan run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlanReport {
    pub run_id: RunId,
    /// every step executed and succeeded
    pub success: bool,
    pub steps: Vec<StepResult>,
    /// steps never started because of a failure or cancellation
    pub skipped: usize,
    /// first step error, or the run-level error
    pub error: Option<StepError>,
    pub state: RunState,
    pub execution_time_ms: u64,
}
