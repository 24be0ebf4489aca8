//! Weighted shortest-path search over the navigation forest.
//!
//! The search runs Dijkstra over positions `(tree_id, node_id)`. Moves out of a position
//! are the tree's own arcs (one per traversable action set), a virtual step into the root
//! of each subtree attached to the node, and, on a subtree root, a virtual step back out
//! to the parent node. Path cost compares lexicographically as
//! `(hops, cumulative weight, trail of (edge id, action set id))`, so fewer transitions
//! always win, reliability breaks ties, and edge ids settle the rest deterministically.
//! Virtual steps cost nothing.

mod transition;
mod weight;

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
    sync::Arc,
};

use tracing::{debug, warn};

use crate::{
    NavflowError, Result,
    metrics::MetricsSink,
    tree::{Forest, Position},
};

pub use transition::{Transition, TransitionKind};
pub use weight::WeightConfig;

/// Path search over a [`Forest`], optionally weighted by recorded metrics.
#[derive(Clone)]
pub struct Pathfinder {
    forest: Forest,
    metrics: Option<Arc<dyn MetricsSink>>,
    weights: WeightConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
struct Cost {
    hops: u32,
    weight: u64,
    trail: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Step {
    kind: TransitionKind,
    from: Position,
    to: Position,
    edge_id: String,
    action_set_id: String,
}

struct Candidate {
    cost: Cost,
    position: Position,
    steps: Vec<Step>,
}

impl PartialEq for Candidate {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.cost == other.cost && self.position == other.position
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    // reversed: BinaryHeap is a max-heap
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        other.cost.cmp(&self.cost).then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Pathfinder {
    pub fn new(
        forest: Forest,
        weights: WeightConfig,
    ) -> Self {
        Self {
            forest,
            metrics: None,
            weights,
        }
    }

    pub fn with_metrics(
        mut self,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Finds the best path from `current_node_id` to `target_node_id`.
    ///
    /// Both nodes are looked up in `tree_id` first and then in its descendant subtrees.
    /// Returns an empty path when they are the same node.
    pub fn find_path(
        &self,
        tree_id: &str,
        current_node_id: &str,
        target_node_id: &str,
    ) -> Result<Vec<Transition>> {
        let start = self.forest.locate(tree_id, current_node_id)?;
        let goal = self.forest.locate(tree_id, target_node_id)?;
        self.find_between(&start, &goal)
    }

    /// Finds the best path between two absolute positions.
    pub fn find_between(
        &self,
        start: &Position,
        goal: &Position,
    ) -> Result<Vec<Transition>> {
        debug!("pathfinder::find_between({} -> {})", start, goal);
        if start == goal {
            return Ok(vec![]);
        }

        // weights are read once per arc and search
        let mut weight_cache: HashMap<(String, String), u64> = HashMap::new();
        let mut best: HashMap<Position, Cost> = HashMap::new();
        let mut settled: HashSet<Position> = HashSet::new();
        let mut heap = BinaryHeap::new();

        best.insert(start.clone(), Cost::default());
        heap.push(Candidate {
            cost: Cost::default(),
            position: start.clone(),
            steps: vec![],
        });

        while let Some(Candidate {
            cost,
            position,
            steps,
        }) = heap.pop()
        {
            if !settled.insert(position.clone()) {
                continue;
            }
            if &position == goal {
                debug!("pathfinder: {} transitions, cost ({}, {})", steps.len(), cost.hops, cost.weight);
                return self.materialize(&steps);
            }

            for step in self.moves_from(&position)? {
                if settled.contains(&step.to) {
                    continue;
                }

                let mut next = cost.clone();
                if step.kind == TransitionKind::Edge {
                    next.hops += 1;
                    next.weight += self.arc_weight(&mut weight_cache, &step.edge_id, &step.action_set_id);
                }
                next.trail.push((step.edge_id.clone(), step.action_set_id.clone()));

                if best.get(&step.to).is_some_and(|known| known <= &next) {
                    continue;
                }
                best.insert(step.to.clone(), next.clone());

                let mut next_steps = steps.clone();
                let to = step.to.clone();
                next_steps.push(step);
                heap.push(Candidate {
                    cost: next,
                    position: to,
                    steps: next_steps,
                });
            }
        }

        Err(NavflowError::NoPathFound {
            from: start.to_string(),
            to: goal.to_string(),
        })
    }

    fn moves_from(
        &self,
        position: &Position,
    ) -> Result<Vec<Step>> {
        let tree = self.forest.tree(&position.tree_id)?;
        let mut moves = Vec::new();

        for (arc, dest) in tree.arcs_from(&position.node_id)? {
            moves.push(Step {
                kind: TransitionKind::Edge,
                from: position.clone(),
                to: Position::new(tree.id(), dest.id.as_str()),
                edge_id: arc.edge_id.clone(),
                action_set_id: arc.action_set_id.clone(),
            });
        }

        for subtree in self.forest.subtrees_of(tree.id(), &position.node_id) {
            moves.push(Step {
                kind: TransitionKind::EnterSubtree,
                from: position.clone(),
                to: Position::new(subtree.id(), subtree.root_node_id()),
                edge_id: format!("{}:{}", TransitionKind::EnterSubtree.as_ref(), subtree.id()),
                action_set_id: String::new(),
            });
        }

        if let Some(parent) = tree.parent() {
            if tree.root_node_id() == position.node_id && self.forest.get(&parent.tree_id).is_some() {
                moves.push(Step {
                    kind: TransitionKind::ExitSubtree,
                    from: position.clone(),
                    to: Position::new(parent.tree_id.as_str(), parent.node_id.as_str()),
                    edge_id: format!("{}:{}", TransitionKind::ExitSubtree.as_ref(), parent.tree_id),
                    action_set_id: String::new(),
                });
            }
        }

        Ok(moves)
    }

    fn arc_weight(
        &self,
        cache: &mut HashMap<(String, String), u64>,
        edge_id: &str,
        action_set_id: &str,
    ) -> u64 {
        let key = (edge_id.to_string(), action_set_id.to_string());
        if let Some(weight) = cache.get(&key) {
            return *weight;
        }

        let metrics = match &self.metrics {
            Some(sink) => match sink.get_direction_metrics(edge_id, action_set_id) {
                Ok(metrics) => metrics,
                Err(err) => {
                    warn!("metrics unavailable for {}/{}: {}", edge_id, action_set_id, err);
                    None
                }
            },
            None => None,
        };
        let weight = self.weights.fixed_weight(metrics.as_ref());
        cache.insert(key, weight);
        weight
    }

    fn materialize(
        &self,
        steps: &[Step],
    ) -> Result<Vec<Transition>> {
        let mut path = Vec::with_capacity(steps.len());
        for step in steps {
            let to_tree = self.forest.tree(&step.to.tree_id)?;
            let to = to_tree.node(&step.to.node_id)?;

            let transition = match step.kind {
                TransitionKind::Edge => {
                    let edge = to_tree
                        .get_edge(&step.edge_id)
                        .ok_or_else(|| NavflowError::GraphInconsistency(format!("edge {} not found in tree {}", step.edge_id, to_tree.id())))?;
                    let set = edge
                        .action_set(&step.action_set_id)
                        .ok_or_else(|| NavflowError::GraphInconsistency(format!("edge {}: action set {} not found", edge.id, step.action_set_id)))?;
                    let from = to_tree.node(&step.from.node_id)?;
                    Transition::edge(&to_tree, edge, set, from, to)
                }
                kind => {
                    let from_tree = self.forest.tree(&step.from.tree_id)?;
                    let from = from_tree.node(&step.from.node_id)?;
                    Transition::virtual_step(kind, to_tree.id(), from, to)
                }
            };
            path.push(transition);
        }
        Ok(path)
    }
}
