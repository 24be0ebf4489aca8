use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    Result,
    common::MemCache,
    device::Device,
    executor::{NavigationExecutor, PathResult},
    pathfinder::Pathfinder,
    runtime::Context,
    tree::{Forest, Position},
};

const MAX_TRACKED_POSITIONS: usize = 4096;

/// Goal-directed navigation with per-device position tracking.
///
/// Positions are tracked per device and root tree, so a device can be driven in several
/// trees independently. An unknown or stale position falls back to the tree root.
pub(crate) struct Navigator {
    forest: Forest,
    pathfinder: Arc<Pathfinder>,
    positions: MemCache<String, Position>,
    capture_screenshots: bool,
}

impl Navigator {
    pub fn new(
        forest: Forest,
        pathfinder: Arc<Pathfinder>,
        capture_screenshots: bool,
    ) -> Self {
        Self {
            forest,
            pathfinder,
            positions: MemCache::new(MAX_TRACKED_POSITIONS),
            capture_screenshots,
        }
    }

    pub fn pathfinder(&self) -> Arc<Pathfinder> {
        self.pathfinder.clone()
    }

    pub fn executor(
        &self,
        device: Device,
        ctx: Arc<Context>,
    ) -> NavigationExecutor {
        NavigationExecutor::new(device, ctx).with_screenshots(self.capture_screenshots)
    }

    /// Last known position of `device_id` in `tree_id`, or the tree root.
    pub fn position(
        &self,
        device_id: &str,
        tree_id: &str,
    ) -> Result<Position> {
        let tracked = self.positions.get(&key(device_id, tree_id)).filter(|position| self.forest.get(&position.tree_id).is_some_and(|tree| tree.contains_node(&position.node_id)));
        match tracked {
            Some(position) => Ok(position),
            None => {
                let tree = self.forest.tree(tree_id)?;
                Ok(Position::new(tree_id, tree.root_node_id()))
            }
        }
    }

    pub fn set_position(
        &self,
        device_id: &str,
        tree_id: &str,
        position: Position,
    ) {
        self.positions.set(key(device_id, tree_id), position);
    }

    /// Finds and executes a path from the tracked position to `target` (node id or label).
    ///
    /// Lookup failures are returned as errors; execution failures are part of the
    /// returned [`PathResult`]. The tracked position moves to the last node reached.
    pub async fn navigate(
        &self,
        device: &Device,
        ctx: Arc<Context>,
        tree_id: &str,
        target: &str,
    ) -> Result<PathResult> {
        let goal = self.forest.resolve(tree_id, target)?;
        let start = self.position(device.id(), tree_id)?;
        let path = self.pathfinder.find_between(&start, &goal)?;
        info!("device {}: navigating {} -> {} in {} transitions", device.id(), start, goal, path.len());

        let result = self.executor(device.clone(), ctx).execute_path(&path).await;
        if let Some(reached) = &result.final_node {
            debug!("device {} now at {}", device.id(), reached);
            self.set_position(device.id(), tree_id, reached.clone());
        }
        Ok(result)
    }
}

fn key(
    device_id: &str,
    tree_id: &str,
) -> String {
    format!("{}:{}", device_id, tree_id)
}
