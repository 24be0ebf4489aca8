use serde::{Deserialize, Serialize};

use crate::model::Verification;

/// Kind of screen a node represents.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    #[default]
    Screen,
    Menu,
    Entry,
    Action,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeModel {
    pub id: String,
    pub label: String,
    #[serde(default, rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub verifications: Vec<Verification>,
}

impl NodeModel {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type: NodeType::Screen,
            verifications: Vec::new(),
        }
    }

    pub fn with_verification(
        mut self,
        verification: Verification,
    ) -> Self {
        self.verifications.push(verification);
        self
    }
}
