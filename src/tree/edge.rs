//! Navigation edges and their directed arcs.

use serde::{Deserialize, Serialize};

use crate::{
    model::{ActionSet, ActionSetDirection, EdgeModel},
    tree::NodeId,
};

/// Unique identifier for an edge within a tree.
pub type EdgeId = String;

/// Runtime edge: a transition between two screens with its action sets.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub action_sets: Vec<ActionSet>,
    pub default_action_set_id: Option<String>,
}

impl From<&EdgeModel> for Edge {
    fn from(model: &EdgeModel) -> Self {
        Self {
            id: model.id.clone(),
            source: model.source.clone(),
            target: model.target.clone(),
            action_sets: model.action_sets.clone(),
            default_action_set_id: model.default_action_set_id.clone(),
        }
    }
}

impl Edge {
    /// Looks up an action set by id.
    pub fn action_set(
        &self,
        id: &str,
    ) -> Option<&ActionSet> {
        self.action_sets.iter().find(|set| set.id == id)
    }

    /// The action set named by `default_action_set_id`, or the first one.
    pub fn default_action_set(&self) -> Option<&ActionSet> {
        match &self.default_action_set_id {
            Some(id) => self.action_set(id),
            None => self.action_sets.first(),
        }
    }

    /// Traversal direction of the action set at `index`.
    pub fn direction_of(
        &self,
        index: usize,
    ) -> Option<ActionSetDirection> {
        self.action_sets.get(index).map(|set| set.direction.unwrap_or_else(|| ActionSetDirection::for_index(index)))
    }

    /// One arc per traversable action set.
    pub fn directions(&self) -> Vec<EdgeDirection> {
        self.action_sets
            .iter()
            .enumerate()
            .filter(|(_, set)| set.is_traversable())
            .filter_map(|(index, set)| {
                self.direction_of(index).map(|direction| EdgeDirection {
                    edge_id: self.id.clone(),
                    action_set_id: set.id.clone(),
                    direction,
                })
            })
            .collect()
    }
}

/// A directed arc of the navigation graph: one edge walked with one action set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeDirection {
    pub edge_id: EdgeId,
    pub action_set_id: String,
    pub direction: ActionSetDirection,
}

#[cfg(test)]
mod test {
    use crate::model::{Action, ActionSet, ActionSetDirection, EdgeModel};

    use super::Edge;

    #[test]
    fn test_edge_directions() {
        let model = EdgeModel::new("e1", "home", "settings")
            .with_action_set(ActionSet::new("fwd").with_action(Action::new("press_key")))
            .with_action_set(ActionSet::new("bwd").with_action(Action::new("press_key")))
            .with_action_set(ActionSet::new("empty"))
            .with_action_set(ActionSet::new("alt").with_direction(ActionSetDirection::Backward).with_action(Action::new("tap")));
        let edge = Edge::from(&model);

        let directions = edge.directions();
        assert_eq!(directions.len(), 3);
        assert_eq!(directions[0].direction, ActionSetDirection::Forward);
        assert_eq!(directions[1].direction, ActionSetDirection::Backward);
        assert_eq!(directions[2].action_set_id, "alt");
        assert_eq!(directions[2].direction, ActionSetDirection::Backward);

        assert_eq!(edge.default_action_set().map(|s| s.id.as_str()), Some("fwd"));
        assert!(edge.action_set("missing").is_none());
    }
}
