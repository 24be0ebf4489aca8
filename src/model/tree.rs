use serde::{Deserialize, Serialize};

use crate::{
    NavflowError, Result,
    model::{EdgeModel, NodeModel},
};

/// Attachment point of a subtree inside its parent tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    pub tree_id: String,
    pub node_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeModel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// entry node; the first node when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_node_id: Option<String>,
    /// set when this tree is nested under a node of another tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub edges: Vec<EdgeModel>,
}

impl TreeModel {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<TreeModel>(s).map_err(|e| NavflowError::Convert(format!("invalid tree: {}", e)))
    }
}

#[cfg(test)]
mod test {
    use crate::model::{ActionSetDirection, NodeType, TreeModel, VerificationType};

    #[test]
    fn test_tree_from_json() {
        let text = r#"{
            "id": "tv",
            "name": "TV main",
            "nodes": [
                {"id": "home", "label": "Home", "type": "entry"},
                {"id": "settings", "label": "Settings", "verifications": [
                    {"verification_type": "text", "command": "waitForTextToAppear", "params": {"text": "Settings"}}
                ]}
            ],
            "edges": [
                {"id": "e1", "source": "home", "target": "settings", "action_sets": [
                    {"id": "home_to_settings", "actions": [{"command": "press_key", "params": {"key": "DOWN"}}]},
                    {"id": "settings_to_home", "direction": "backward", "actions": [{"command": "press_key", "params": {"key": "BACK"}}]}
                ]}
            ]
        }"#;

        let tree = TreeModel::from_json(text).unwrap();
        assert_eq!(tree.nodes[0].node_type, NodeType::Entry);
        assert_eq!(tree.nodes[1].node_type, NodeType::Screen);
        assert_eq!(tree.nodes[1].verifications[0].verification_type, VerificationType::Text);
        assert_eq!(tree.edges[0].action_sets[1].direction, Some(ActionSetDirection::Backward));
        assert!(tree.edges[0].action_sets[0].retry_actions.is_empty());
        assert!(tree.root_node_id.is_none());
    }

    #[test]
    fn test_tree_from_invalid_json() {
        assert!(TreeModel::from_json(r#"{"id": "tv"}"#).is_err());
    }
}
