mod collect;
mod r#impl;

use std::sync::Arc;

use crate::{
    config::StoreConfig,
    store::{DbCollection, DbStore, Store, data::*},
};
pub use collect::Collect;

#[derive(Debug, Clone)]
pub struct MemStore {
    runs: Arc<Collect<RunStatus>>,
    edge_metrics: Arc<Collect<DirectionMetrics>>,
    node_metrics: Arc<Collect<NodeMetricsSummary>>,
    actions: Arc<Collect<ActionExecution>>,
}

/// A record addressable by a string key.
trait DbDocument: Clone + Send + Sync {
    fn id(&self) -> String;
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) {
        s.register(self.runs());
        s.register(self.edge_metrics());
        s.register(self.node_metrics());
        s.register(self.actions());
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Store whose run history and action log are capped by `config`.
    /// Metric aggregates are one record per edge direction or node and stay unbounded.
    pub fn with_config(config: &StoreConfig) -> Self {
        Self {
            runs: Arc::new(Collect::with_capacity("runs", config.run_history_size)),
            edge_metrics: Arc::new(Collect::new("edge_metrics")),
            node_metrics: Arc::new(Collect::new("node_metrics")),
            actions: Arc::new(Collect::with_capacity("actions", config.action_log_size)),
        }
    }

    pub fn runs(&self) -> Arc<dyn DbCollection<Item = RunStatus> + Send + Sync> {
        self.runs.clone()
    }

    pub fn edge_metrics(&self) -> Arc<dyn DbCollection<Item = DirectionMetrics> + Send + Sync> {
        self.edge_metrics.clone()
    }

    pub fn node_metrics(&self) -> Arc<dyn DbCollection<Item = NodeMetricsSummary> + Send + Sync> {
        self.node_metrics.clone()
    }

    pub fn actions(&self) -> Arc<dyn DbCollection<Item = ActionExecution> + Send + Sync> {
        self.actions.clone()
    }
}
