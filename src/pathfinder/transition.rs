use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{
    model::{Action, ActionSet, Verification},
    tree::{Edge, Node, Position, Tree},
};

#[derive(AsRefStr, EnumString, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransitionKind {
    /// walk an edge with one of its action sets
    Edge,
    /// step from a node into the root of an attached subtree
    EnterSubtree,
    /// step from a subtree root back to the node it hangs off
    ExitSubtree,
}

/// One step of a navigation path.
///
/// Carries everything needed to execute it, so execution never consults the tree again.
/// `tree_id` is the tree of the destination node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub tree_id: String,
    pub edge_id: String,
    pub action_set_id: String,
    pub from_node_id: String,
    pub to_node_id: String,
    pub from_node_label: String,
    pub to_node_label: String,
    pub actions: Vec<Action>,
    pub retry_actions: Vec<Action>,
    pub failure_actions: Vec<Action>,
    pub final_wait_time: u64,
    /// checks of the destination node
    pub verifications: Vec<Verification>,
}

impl Transition {
    pub(crate) fn edge(
        tree: &Tree,
        edge: &Edge,
        set: &ActionSet,
        from: &Node,
        to: &Node,
    ) -> Self {
        Self {
            kind: TransitionKind::Edge,
            tree_id: tree.id().to_string(),
            edge_id: edge.id.clone(),
            action_set_id: set.id.clone(),
            from_node_id: from.id.clone(),
            to_node_id: to.id.clone(),
            from_node_label: from.label.clone(),
            to_node_label: to.label.clone(),
            actions: set.actions.clone(),
            retry_actions: set.retry_actions.clone(),
            failure_actions: set.failure_actions.clone(),
            final_wait_time: set.final_wait_time,
            verifications: to.verifications.clone(),
        }
    }

    pub(crate) fn virtual_step(
        kind: TransitionKind,
        to_tree: &str,
        from: &Node,
        to: &Node,
    ) -> Self {
        Self {
            kind,
            tree_id: to_tree.to_string(),
            edge_id: format!("{}:{}", kind.as_ref(), to_tree),
            action_set_id: String::new(),
            from_node_id: from.id.clone(),
            to_node_id: to.id.clone(),
            from_node_label: from.label.clone(),
            to_node_label: to.label.clone(),
            actions: vec![],
            retry_actions: vec![],
            failure_actions: vec![],
            final_wait_time: 0,
            verifications: vec![],
        }
    }

    /// Whether the step changes tree without touching the device.
    pub fn is_virtual(&self) -> bool {
        self.kind != TransitionKind::Edge
    }

    pub fn destination(&self) -> Position {
        Position::new(self.tree_id.as_str(), self.to_node_id.as_str())
    }
}
