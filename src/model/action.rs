use serde::{Deserialize, Serialize};

use crate::common::Params;

/// Capability channel an action is routed to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    #[default]
    Remote,
    Web,
    Desktop,
    Verification,
    Power,
}

/// One device command with its parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Action {
    /// command name, identifies a device capability
    pub command: String,
    /// command parameters
    #[serde(default)]
    pub params: Params,
    /// explicit routing hint; inferred from the command when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<ActionType>,
    /// number of iterations, clamped to [1, 100]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterator: Option<u32>,
    /// pause in milliseconds between iterations and after the last one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<u64>,
}

impl Action {
    pub const MAX_ITERATIONS: u32 = 100;

    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Params::new(),
            action_type: None,
            iterator: None,
            wait_time: None,
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

    pub fn with_type(
        mut self,
        action_type: ActionType,
    ) -> Self {
        self.action_type = Some(action_type);
        self
    }

    pub fn with_iterator(
        mut self,
        iterator: u32,
    ) -> Self {
        self.iterator = Some(iterator);
        self
    }

    pub fn with_wait_time(
        mut self,
        wait_time: u64,
    ) -> Self {
        self.wait_time = Some(wait_time);
        self
    }

    /// Number of iterations to run once the action has been routed.
    pub fn iteration_count(
        &self,
        routed: ActionType,
    ) -> u32 {
        if routed == ActionType::Verification {
            return 1;
        }
        self.iterator.unwrap_or(1).clamp(1, Self::MAX_ITERATIONS)
    }

    /// Wait in milliseconds, from the action itself or from `params.wait_time`.
    pub fn wait_time_ms(&self) -> u64 {
        self.wait_time.or_else(|| self.params.get_millis("wait_time")).unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{Action, ActionType};

    #[test]
    fn test_iteration_count_clamped() {
        assert_eq!(Action::new("press_key").iteration_count(ActionType::Remote), 1);
        assert_eq!(Action::new("press_key").with_iterator(0).iteration_count(ActionType::Remote), 1);
        assert_eq!(Action::new("press_key").with_iterator(7).iteration_count(ActionType::Remote), 7);
        assert_eq!(Action::new("press_key").with_iterator(500).iteration_count(ActionType::Remote), 100);
        assert_eq!(Action::new("waitForTextToAppear").with_iterator(5).iteration_count(ActionType::Verification), 1);
    }

    #[test]
    fn test_action_deserialize() {
        let action: Action = serde_json::from_value(json!({
            "command": "press_key",
            "params": {"key": "DOWN", "wait_time": 250},
            "action_type": "remote",
            "iterator": 3
        }))
        .unwrap();

        assert_eq!(action.action_type, Some(ActionType::Remote));
        assert_eq!(action.iterator, Some(3));
        assert_eq!(action.wait_time_ms(), 250);
        assert_eq!(action.with_wait_time(10).wait_time_ms(), 10);
    }
}
