use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{
    dispatcher::StepResult,
    executor::StepError,
    store::{DbCollectionIden, StoreIden},
    utils,
};

/// Lifecycle of a plan run.
///
/// `pending -> generating_plan -> executing -> summarizing -> completed | failed | cancelled`;
/// `generating_plan` only occurs when the plan comes from a prompt.
#[derive(AsRefStr, EnumString, Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    #[default]
    Pending,
    GeneratingPlan,
    Executing,
    Summarizing,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed | RunState::Cancelled)
    }
}

/// Pollable status of one run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RunStatus {
    pub run_id: String,
    pub device_id: String,
    pub tree_id: String,

    pub state: RunState,
    pub current_step: usize,
    pub total_steps: usize,
    pub step_results: Vec<StepResult>,
    pub progress_percentage: f64,
    pub error: Option<StepError>,

    pub start_time: i64,
    pub end_time: i64,
    pub timestamp: i64,
}

impl DbCollectionIden for RunStatus {
    fn iden() -> StoreIden {
        StoreIden::Runs
    }
}

impl RunStatus {
    pub fn new(
        run_id: &str,
        device_id: &str,
        tree_id: &str,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            device_id: device_id.to_string(),
            tree_id: tree_id.to_string(),
            state: RunState::Pending,
            current_step: 0,
            total_steps: 0,
            step_results: Vec::new(),
            progress_percentage: 0.0,
            error: None,
            start_time: utils::time::time_millis(),
            end_time: 0,
            timestamp: 0,
        }
    }

    /// Appends a finished step and advances the progress counters.
    pub fn record_step(
        &mut self,
        result: StepResult,
    ) {
        self.step_results.push(result);
        self.current_step = self.step_results.len();
        if self.total_steps > 0 {
            self.progress_percentage = (self.current_step as f64 / self.total_steps as f64 * 100.0).min(100.0);
        }
    }

    /// Moves the run into a terminal state.
    pub fn finish(
        &mut self,
        state: RunState,
        error: Option<StepError>,
    ) {
        self.state = state;
        if error.is_some() {
            self.error = error;
        }
        self.end_time = utils::time::time_millis();
    }
}
