use serde::{Deserialize, Serialize};

use crate::model::Action;

/// Which way an action set traverses its edge.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionSetDirection {
    /// source -> target
    Forward,
    /// target -> source
    Backward,
}

impl ActionSetDirection {
    /// Index convention: 0 is forward, 1 is backward, further sets are forward alternatives.
    pub fn for_index(index: usize) -> Self {
        if index == 1 {
            ActionSetDirection::Backward
        } else {
            ActionSetDirection::Forward
        }
    }
}

/// One direction's executable recipe for traversing an edge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionSet {
    pub id: String,
    /// explicit direction; the index convention applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<ActionSetDirection>,
    /// main actions
    #[serde(default)]
    pub actions: Vec<Action>,
    /// executed only when a main action fails
    #[serde(default)]
    pub retry_actions: Vec<Action>,
    /// executed when main failed and retry failed or was absent
    #[serde(default)]
    pub failure_actions: Vec<Action>,
    /// pause in milliseconds after the actions fully succeed
    #[serde(default)]
    pub final_wait_time: u64,
}

impl ActionSet {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            direction: None,
            actions: Vec::new(),
            retry_actions: Vec::new(),
            failure_actions: Vec::new(),
            final_wait_time: 0,
        }
    }

    pub fn with_direction(
        mut self,
        direction: ActionSetDirection,
    ) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_action(
        mut self,
        action: Action,
    ) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_retry(
        mut self,
        action: Action,
    ) -> Self {
        self.retry_actions.push(action);
        self
    }

    pub fn with_failure(
        mut self,
        action: Action,
    ) -> Self {
        self.failure_actions.push(action);
        self
    }

    /// An action set without main actions cannot move the device.
    pub fn is_traversable(&self) -> bool {
        !self.actions.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeModel {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub action_sets: Vec<ActionSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_action_set_id: Option<String>,
}

impl EdgeModel {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            action_sets: Vec::new(),
            default_action_set_id: None,
        }
    }

    pub fn with_action_set(
        mut self,
        action_set: ActionSet,
    ) -> Self {
        self.action_sets.push(action_set);
        self
    }
}
