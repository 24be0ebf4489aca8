use serde::{Deserialize, Serialize};

use crate::{NavflowError, Result, common::Params, device::is_verification_command};

/// Kind of a plan step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepType {
    Navigation,
    Action,
    Verification,
    Wait,
}

/// One high-level step of an [`ExecutionPlan`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlanStep {
    /// explicit kind; inferred from the command when absent
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub step_type: Option<StepType>,
    pub command: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub description: String,
}

impl PlanStep {
    pub fn navigation(target_node: &str) -> Self {
        Self {
            step_type: Some(StepType::Navigation),
            command: "execute_navigation".to_string(),
            params: Params::new().with("target_node", target_node),
            description: format!("navigate to {}", target_node),
        }
    }

    pub fn action(command: &str) -> Self {
        Self {
            step_type: Some(StepType::Action),
            command: command.to_string(),
            params: Params::new(),
            description: command.to_string(),
        }
    }

    pub fn verification(command: &str) -> Self {
        Self {
            step_type: Some(StepType::Verification),
            command: command.to_string(),
            params: Params::new(),
            description: command.to_string(),
        }
    }

    pub fn wait(duration_ms: u64) -> Self {
        Self {
            step_type: Some(StepType::Wait),
            command: "wait".to_string(),
            params: Params::new().with("duration", duration_ms),
            description: format!("wait {}ms", duration_ms),
        }
    }

    pub fn with_param(
        mut self,
        key: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.params.set(key, value);
        self
    }

    /// Explicit step type, or the one implied by the command.
    pub fn kind(&self) -> StepType {
        if let Some(step_type) = self.step_type {
            return step_type;
        }
        match self.command.as_str() {
            "execute_navigation" | "navigate" | "navigate_to" => StepType::Navigation,
            "wait" | "sleep" => StepType::Wait,
            cmd if is_verification_command(cmd) => StepType::Verification,
            _ => StepType::Action,
        }
    }
}

/// Ordered plan produced once per run by a plan generator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default = "default_feasible")]
    pub feasible: bool,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

fn default_feasible() -> bool {
    true
}

impl ExecutionPlan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self {
            id: String::new(),
            analysis: String::new(),
            feasible: true,
            steps,
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<ExecutionPlan>(s).map_err(|e| NavflowError::Convert(format!("invalid plan: {}", e)))
    }
}
