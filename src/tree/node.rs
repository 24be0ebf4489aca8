use serde::{Deserialize, Serialize};

use crate::model::{NodeModel, NodeType, Verification};

/// node id
pub type NodeId = String;

/// Runtime node: one UI screen and the checks proving the device is on it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub node_type: NodeType,
    pub verifications: Vec<Verification>,
}

impl From<&NodeModel> for Node {
    fn from(model: &NodeModel) -> Self {
        Self {
            id: model.id.clone(),
            label: model.label.clone(),
            node_type: model.node_type,
            verifications: model.verifications.clone(),
        }
    }
}
