//! Runtime navigation graph.
//!
//! A [`Tree`] is the petgraph representation of one navigation tree. Every traversable
//! action set of an edge becomes one directed arc, so an edge with a forward and a
//! backward action set can be walked both ways. The [`Forest`] holds all deployed trees
//! and resolves nested subtrees.

mod edge;
mod forest;
mod node;
mod tree;

use serde::{Deserialize, Serialize};

pub use edge::{Edge, EdgeDirection, EdgeId};
pub use forest::{Forest, TreeId};
pub use node::{Node, NodeId};
pub use tree::Tree;

/// Location of the device across nested trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub tree_id: TreeId,
    pub node_id: NodeId,
}

impl Position {
    pub fn new(
        tree_id: impl Into<TreeId>,
        node_id: impl Into<NodeId>,
    ) -> Self {
        Self {
            tree_id: tree_id.into(),
            node_id: node_id.into(),
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}/{}", self.tree_id, self.node_id)
    }
}
