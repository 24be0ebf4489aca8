//! Runtime navigation tree using a directed graph.
//!
//! Wraps the tree model in a petgraph `DiGraph` whose nodes are screens and whose arcs
//! are edge directions. Lookups by id go through an index map; iteration orders are
//! stable (edges sorted by id) so every query is deterministic.

use std::collections::{BTreeMap, HashMap};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    NavflowError, Result,
    model::{ActionSetDirection, ParentRef, TreeModel, Verification},
    tree::{Edge, EdgeDirection, EdgeId, Node, NodeId, TreeId},
};

/// Runtime navigation tree.
///
/// Immutable while it is being navigated; editing operations take `&mut self` and are
/// applied by the [`Forest`](crate::Forest) on a private copy.
#[derive(Debug, Clone)]
pub struct Tree {
    id: TreeId,
    name: String,
    root: NodeId,
    parent: Option<ParentRef>,
    graph: DiGraph<Node, EdgeDirection>,
    index: HashMap<NodeId, NodeIndex>,
    edges: BTreeMap<EdgeId, Edge>,
}

impl Tree {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry node of the tree.
    pub fn root_node_id(&self) -> &str {
        &self.root
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(
        &self,
        id: &str,
    ) -> bool {
        self.index.contains_key(id)
    }

    /// get node by id
    pub fn get_node(
        &self,
        id: &str,
    ) -> Option<&Node> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    /// get node by id, treating absence as a broken graph
    pub fn node(
        &self,
        id: &str,
    ) -> Result<&Node> {
        self.get_node(id).ok_or_else(|| NavflowError::GraphInconsistency(format!("node {} not found in tree {}", id, self.id)))
    }

    /// get edge by id
    pub fn get_edge(
        &self,
        id: &str,
    ) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// get root node
    pub fn root_node(&self) -> &Node {
        // root is validated at construction
        &self.graph[self.index[&self.root]]
    }

    /// get all node ids
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().map(|idx| self.graph[idx].id.clone()).collect()
    }

    /// All edges whose source is `node_id`, ordered by edge id.
    pub fn get_outgoing_edges(
        &self,
        node_id: &str,
    ) -> Vec<&Edge> {
        self.edges.values().filter(|edge| edge.source == node_id).collect()
    }

    /// Directed arcs leaving `node_id` with their destination, ordered by (edge id, action set id).
    pub fn arcs_from(
        &self,
        node_id: &str,
    ) -> Result<Vec<(&EdgeDirection, &Node)>> {
        let idx = self.index.get(node_id).ok_or_else(|| NavflowError::GraphInconsistency(format!("node {} not found in tree {}", node_id, self.id)))?;

        let mut arcs: Vec<(&EdgeDirection, &Node)> = self.graph.edges_directed(*idx, Direction::Outgoing).map(|e| (e.weight(), &self.graph[e.target()])).collect();
        arcs.sort_by(|(a, _), (b, _)| (&a.edge_id, &a.action_set_id).cmp(&(&b.edge_id, &b.action_set_id)));
        Ok(arcs)
    }

    /// Resolves a node by display label: exact match first, then case-insensitive.
    pub fn resolve_node_by_label(
        &self,
        label: &str,
    ) -> Option<&Node> {
        let mut nodes: Vec<&Node> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        nodes.iter().find(|n| n.label == label).or_else(|| nodes.iter().find(|n| n.label.eq_ignore_ascii_case(label))).copied()
    }

    /// Resolves a node by id, then by label.
    pub fn resolve_node(
        &self,
        id_or_label: &str,
    ) -> Option<&Node> {
        self.get_node(id_or_label).or_else(|| self.resolve_node_by_label(id_or_label))
    }

    /// Appends a verification to a node.
    pub fn add_verification(
        &mut self,
        node_id: &str,
        verification: Verification,
    ) -> Result<()> {
        let idx = *self.index.get(node_id).ok_or_else(|| NavflowError::GraphInconsistency(format!("node {} not found in tree {}", node_id, self.id)))?;
        self.graph[idx].verifications.push(verification);
        Ok(())
    }

    /// Removes the verification at `index` from a node.
    pub fn remove_verification(
        &mut self,
        node_id: &str,
        index: usize,
    ) -> Result<Verification> {
        let idx = *self.index.get(node_id).ok_or_else(|| NavflowError::GraphInconsistency(format!("node {} not found in tree {}", node_id, self.id)))?;
        let verifications = &mut self.graph[idx].verifications;
        if index >= verifications.len() {
            return Err(NavflowError::GraphInconsistency(format!("node {} has no verification at index {}", node_id, index)));
        }
        Ok(verifications.remove(index))
    }

    /// Output a human-readable representation of the tree graph
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("=== Tree {} ({}) ===", self.id, self.name));
        lines.push(format!("Nodes: {}, Edges: {}, Arcs: {}", self.graph.node_count(), self.edges.len(), self.graph.edge_count()));
        if let Some(parent) = &self.parent {
            lines.push(format!("Subtree of: {}/{}", parent.tree_id, parent.node_id));
        }
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let marker = if node.id == self.root {
                " (root)"
            } else {
                ""
            };
            lines.push(format!("[{}] {} (type: {}, verifications: {}){}", node.id, node.label, node.node_type.as_ref(), node.verifications.len(), marker));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for edge in self.edges.values() {
            let sets: Vec<String> = edge
                .action_sets
                .iter()
                .enumerate()
                .map(|(i, set)| format!("{}:{}({} actions)", set.id, edge.direction_of(i).map(|d| d.as_ref().to_string()).unwrap_or_default(), set.actions.len()))
                .collect();
            lines.push(format!("{} --> {} (id: {}, sets: {})", edge.source, edge.target, edge.id, sets.join(", ")));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let outgoing: Vec<String> =
                self.graph.edges_directed(idx, Direction::Outgoing).map(|e| format!("{}({})", self.graph[e.target()].id, e.weight().action_set_id)).collect();

            if outgoing.is_empty() {
                lines.push(format!("{} -> (none)", node.id));
            } else {
                lines.push(format!("{} -> {}", node.id, outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }
}

impl TryFrom<&TreeModel> for Tree {
    type Error = NavflowError;

    fn try_from(model: &TreeModel) -> Result<Self> {
        if model.id.is_empty() {
            return Err(NavflowError::GraphInconsistency("missing id in tree".into()));
        }
        if model.nodes.is_empty() {
            return Err(NavflowError::GraphInconsistency(format!("tree {} has no nodes", model.id)));
        }

        let mut graph: DiGraph<Node, EdgeDirection> = DiGraph::new();
        let mut index = HashMap::new();

        for node in model.nodes.iter() {
            if index.contains_key(&node.id) {
                return Err(NavflowError::GraphInconsistency(format!("duplicate node id {} in tree {}", node.id, model.id)));
            }
            let idx = graph.add_node(Node::from(node));
            index.insert(node.id.clone(), idx);
        }

        let mut edges = BTreeMap::new();
        for edge_model in model.edges.iter() {
            if edges.contains_key(&edge_model.id) {
                return Err(NavflowError::GraphInconsistency(format!("duplicate edge id {} in tree {}", edge_model.id, model.id)));
            }
            let source = *index.get(&edge_model.source).ok_or(NavflowError::GraphInconsistency(format!("edge {}: source node {} not found", edge_model.id, edge_model.source)))?;
            let target = *index.get(&edge_model.target).ok_or(NavflowError::GraphInconsistency(format!("edge {}: target node {} not found", edge_model.id, edge_model.target)))?;

            let edge = Edge::from(edge_model);
            for (i, set) in edge.action_sets.iter().enumerate() {
                if edge.action_sets[..i].iter().any(|other| other.id == set.id) {
                    return Err(NavflowError::GraphInconsistency(format!("edge {}: duplicate action set {}", edge.id, set.id)));
                }
            }
            if let Some(default_id) = &edge.default_action_set_id {
                if edge.action_set(default_id).is_none() {
                    return Err(NavflowError::GraphInconsistency(format!("edge {}: default action set {} not found", edge.id, default_id)));
                }
            }

            for direction in edge.directions() {
                let (from, to) = match direction.direction {
                    ActionSetDirection::Forward => (source, target),
                    ActionSetDirection::Backward => (target, source),
                };
                graph.add_edge(from, to, direction);
            }
            edges.insert(edge.id.clone(), edge);
        }

        let root = model.root_node_id.clone().unwrap_or_else(|| model.nodes[0].id.clone());
        if !index.contains_key(&root) {
            return Err(NavflowError::GraphInconsistency(format!("root node {} not found in tree {}", root, model.id)));
        }

        Ok(Self {
            id: model.id.clone(),
            name: model.name.clone(),
            root,
            parent: model.parent.clone(),
            graph,
            index,
            edges,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{
        NavflowError,
        model::{Action, ActionSet, EdgeModel, NodeModel, TreeModel, Verification, VerificationType},
    };

    use super::Tree;

    fn sample_model() -> TreeModel {
        TreeModel {
            id: "tv".to_string(),
            name: "TV".to_string(),
            root_node_id: None,
            parent: None,
            nodes: vec![NodeModel::new("home", "Home"), NodeModel::new("settings", "Settings"), NodeModel::new("live", "Live TV")],
            edges: vec![
                EdgeModel::new("e_home_settings", "home", "settings")
                    .with_action_set(ActionSet::new("home_to_settings").with_action(Action::new("press_key").with_param("key", "DOWN")))
                    .with_action_set(ActionSet::new("settings_to_home").with_action(Action::new("press_key").with_param("key", "BACK"))),
                EdgeModel::new("e_settings_live", "settings", "live").with_action_set(ActionSet::new("settings_to_live").with_action(Action::new("press_key"))),
            ],
        }
    }

    #[test]
    fn test_tree_from_model() {
        let tree = Tree::try_from(&sample_model()).unwrap();
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.edge_count(), 2);
        assert_eq!(tree.root_node().id, "home");

        let out: Vec<&str> = tree.get_outgoing_edges("settings").iter().map(|e| e.id.as_str()).collect();
        assert_eq!(out, vec!["e_settings_live"]);

        // the backward action set makes settings -> home walkable
        let arcs: Vec<(&str, &str)> = tree.arcs_from("settings").unwrap().iter().map(|(a, n)| (a.action_set_id.as_str(), n.id.as_str())).collect();
        assert_eq!(arcs, vec![("settings_to_home", "home"), ("settings_to_live", "live")]);
        assert!(tree.arcs_from("live").unwrap().is_empty());
        assert!(tree.schema().contains("home -> settings(home_to_settings)"));
    }

    #[test]
    fn test_tree_rejects_inconsistent_model() {
        let mut model = sample_model();
        model.edges.push(EdgeModel::new("dangling", "home", "guide"));
        assert!(matches!(Tree::try_from(&model), Err(NavflowError::GraphInconsistency(_))));

        let mut model = sample_model();
        model.nodes.push(NodeModel::new("home", "Home again"));
        assert!(matches!(Tree::try_from(&model), Err(NavflowError::GraphInconsistency(_))));

        let mut model = sample_model();
        model.root_node_id = Some("guide".to_string());
        assert!(Tree::try_from(&model).is_err());

        let mut model = sample_model();
        model.edges[1].default_action_set_id = Some("nope".to_string());
        assert!(Tree::try_from(&model).is_err());
    }

    #[test]
    fn test_resolve_node_by_label() {
        let tree = Tree::try_from(&sample_model()).unwrap();
        assert_eq!(tree.resolve_node_by_label("Live TV").map(|n| n.id.as_str()), Some("live"));
        assert_eq!(tree.resolve_node_by_label("live tv").map(|n| n.id.as_str()), Some("live"));
        assert_eq!(tree.resolve_node("settings").map(|n| n.id.as_str()), Some("settings"));
        assert!(tree.resolve_node_by_label("Guide").is_none());
    }

    #[test]
    fn test_edit_verifications() {
        let mut tree = Tree::try_from(&sample_model()).unwrap();
        let check = Verification::new(VerificationType::Text, "waitForTextToAppear").with_param("text", "Settings");

        tree.add_verification("settings", check.clone()).unwrap();
        assert_eq!(tree.node("settings").unwrap().verifications.len(), 1);

        assert_eq!(tree.remove_verification("settings", 0).unwrap(), check);
        assert!(tree.remove_verification("settings", 0).is_err());
        assert!(tree.add_verification("guide", check).is_err());
    }
}
