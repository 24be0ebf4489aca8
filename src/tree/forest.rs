//! Registry of deployed navigation trees.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, PoisonError, RwLock},
};

use tracing::trace;

use crate::{
    NavflowError, Result, ShareLock,
    tree::{Position, Tree},
};

/// tree id
pub type TreeId = String;

/// All deployed trees, keyed by id.
///
/// Trees are shared as `Arc<Tree>`: readers keep the version they started with while
/// edits replace the entry with a modified copy. Subtree links are derived from each
/// tree's `parent` reference, so registering trees in any order is fine.
#[derive(Clone, Default)]
pub struct Forest {
    trees: ShareLock<HashMap<TreeId, Arc<Tree>>>,
}

impl Forest {
    pub fn new() -> Self {
        Self {
            trees: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers or replaces a tree.
    pub fn register(
        &self,
        tree: Tree,
    ) -> Result<()> {
        trace!("forest::register({})", tree.id());
        let mut trees = self.trees.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = tree.parent() {
            if parent.tree_id == tree.id() {
                return Err(NavflowError::GraphInconsistency(format!("tree {} cannot be its own subtree", tree.id())));
            }
            if let Some(parent_tree) = trees.get(&parent.tree_id) {
                if !parent_tree.contains_node(&parent.node_id) {
                    return Err(NavflowError::GraphInconsistency(format!(
                        "subtree {} attaches to missing node {}/{}",
                        tree.id(),
                        parent.tree_id,
                        parent.node_id
                    )));
                }
            }

            // walk up the registered ancestors; meeting this tree again closes a cycle
            let mut seen = HashSet::new();
            let mut ancestor = Some(parent.tree_id.clone());
            while let Some(id) = ancestor {
                if id == tree.id() {
                    return Err(NavflowError::GraphInconsistency(format!("subtree {} would become its own ancestor", tree.id())));
                }
                if !seen.insert(id.clone()) {
                    break;
                }
                ancestor = trees.get(&id).and_then(|t| t.parent().map(|p| p.tree_id.clone()));
            }
        }

        trees.insert(tree.id().to_string(), Arc::new(tree));
        Ok(())
    }

    pub fn get(
        &self,
        id: &str,
    ) -> Option<Arc<Tree>> {
        self.trees.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    /// get tree by id, treating absence as a broken graph
    pub fn tree(
        &self,
        id: &str,
    ) -> Result<Arc<Tree>> {
        self.get(id).ok_or_else(|| NavflowError::GraphInconsistency(format!("tree {} not found", id)))
    }

    pub fn tree_ids(&self) -> Vec<TreeId> {
        let mut ids: Vec<TreeId> = self.trees.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Subtrees attached to `node_id` of `tree_id`, ordered by tree id.
    pub fn subtrees_of(
        &self,
        tree_id: &str,
        node_id: &str,
    ) -> Vec<Arc<Tree>> {
        let trees = self.trees.read().unwrap_or_else(PoisonError::into_inner);
        let mut subtrees: Vec<Arc<Tree>> =
            trees.values().filter(|t| t.parent().map(|p| p.tree_id == tree_id && p.node_id == node_id).unwrap_or(false)).cloned().collect();
        subtrees.sort_by(|a, b| a.id().cmp(b.id()));
        subtrees
    }

    /// `tree_id` followed by its descendant subtrees, breadth-first with siblings ordered
    /// by tree id. Every tree is visited once.
    fn descendants(
        &self,
        tree_id: &str,
    ) -> Result<Vec<Arc<Tree>>> {
        let root = self.tree(tree_id)?;
        let mut queue = VecDeque::from([root]);
        let mut seen = HashSet::new();
        let mut order = Vec::new();

        while let Some(tree) = queue.pop_front() {
            if !seen.insert(tree.id().to_string()) {
                continue;
            }
            for child_node in tree.node_ids() {
                queue.extend(self.subtrees_of(tree.id(), &child_node).into_iter().filter(|t| !seen.contains(t.id())));
            }
            order.push(tree);
        }
        Ok(order)
    }

    /// Finds `node_id` in `tree_id` or, failing that, in its descendant subtrees.
    pub fn locate(
        &self,
        tree_id: &str,
        node_id: &str,
    ) -> Result<Position> {
        self.descendants(tree_id)?
            .iter()
            .find(|tree| tree.contains_node(node_id))
            .map(|tree| Position::new(tree.id(), node_id))
            .ok_or_else(|| NavflowError::GraphInconsistency(format!("node {} not found in tree {} or its subtrees", node_id, tree_id)))
    }

    /// Resolves a node by id or label in `tree_id` and its subtrees; ids win over labels.
    pub fn resolve(
        &self,
        tree_id: &str,
        id_or_label: &str,
    ) -> Result<Position> {
        let trees = self.descendants(tree_id)?;
        if let Some(tree) = trees.iter().find(|tree| tree.contains_node(id_or_label)) {
            return Ok(Position::new(tree.id(), id_or_label));
        }

        trees
            .iter()
            .find_map(|tree| tree.resolve_node_by_label(id_or_label).map(|node| Position::new(tree.id(), node.id.clone())))
            .ok_or_else(|| NavflowError::GraphInconsistency(format!("no node with id or label '{}' in tree {}", id_or_label, tree_id)))
    }

    /// Applies an edit to a private copy of the tree and publishes the result.
    pub fn update<R>(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Tree) -> Result<R>,
    ) -> Result<R> {
        let mut trees = self.trees.write().unwrap_or_else(PoisonError::into_inner);
        let current = trees.get(id).ok_or_else(|| NavflowError::NotFound(format!("tree {}", id)))?;

        let mut copy = Tree::clone(current);
        let result = edit(&mut copy)?;
        trees.insert(id.to_string(), Arc::new(copy));
        Ok(result)
    }
}
