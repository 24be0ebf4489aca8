//! Execution metrics: the sink interface and its store-backed implementation.
//!
//! Executors never call a sink directly. They publish execution events on the channel
//! and the engine monitor forwards them here, so recording is fire-and-forget. The
//! pathfinder reads the aggregates back as arc weights.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    NavflowError, Result,
    store::{DbCollection, Store},
    utils,
};

pub use crate::store::data::{ActionExecution, DirectionMetrics, NodeMetricsSummary};

/// One walked edge direction.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EdgeExecution {
    pub tree_id: String,
    pub edge_id: String,
    pub action_set_id: String,
    pub success: bool,
    pub execution_time_ms: u64,
    pub message: Option<String>,
    pub timestamp: i64,
}

/// One evaluated node verification.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NodeExecution {
    pub tree_id: String,
    pub node_id: String,
    /// `type:command` of the verification
    pub verification: String,
    pub success: bool,
    pub execution_time_ms: u64,
    pub message: Option<String>,
    pub timestamp: i64,
}

/// Destination of execution metrics.
///
/// Implementations must tolerate concurrent calls. Recording failures are reported to
/// the caller, which logs and drops them.
pub trait MetricsSink: Send + Sync {
    fn record_edge_execution(
        &self,
        execution: &EdgeExecution,
    ) -> Result<()>;

    fn record_node_execution(
        &self,
        execution: &NodeExecution,
    ) -> Result<()>;

    fn record_action_execution(
        &self,
        execution: &ActionExecution,
    ) -> Result<()>;

    /// Aggregate for one edge direction, `None` without history.
    fn get_direction_metrics(
        &self,
        edge_id: &str,
        action_set_id: &str,
    ) -> Result<Option<DirectionMetrics>>;

    fn get_node_metrics(
        &self,
        tree_id: &str,
        node_id: &str,
    ) -> Result<Option<NodeMetricsSummary>>;
}

/// [`MetricsSink`] aggregating into the engine's [`Store`].
///
/// Aggregates are read, folded and written back; the engine monitor is the only writer,
/// which keeps the read-modify-write sequences from interleaving.
#[derive(Clone)]
pub struct StoreMetrics {
    store: Arc<Store>,
}

impl StoreMetrics {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
        }
    }
}

impl MetricsSink for StoreMetrics {
    fn record_edge_execution(
        &self,
        execution: &EdgeExecution,
    ) -> Result<()> {
        trace!("metrics::record_edge_execution({}/{}, {})", execution.edge_id, execution.action_set_id, execution.success);
        let collection = self.store.edge_metrics()?;
        let mut metrics = self.get_direction_metrics(&execution.edge_id, &execution.action_set_id)?.unwrap_or_else(|| DirectionMetrics::new(&execution.edge_id, &execution.action_set_id));
        metrics.record(execution.success, execution.execution_time_ms, execution.timestamp);
        collection.upsert(&metrics)?;
        Ok(())
    }

    fn record_node_execution(
        &self,
        execution: &NodeExecution,
    ) -> Result<()> {
        trace!("metrics::record_node_execution({}/{}, {})", execution.tree_id, execution.node_id, execution.success);
        let collection = self.store.node_metrics()?;
        let mut metrics = self.get_node_metrics(&execution.tree_id, &execution.node_id)?.unwrap_or_else(|| NodeMetricsSummary::new(&execution.tree_id, &execution.node_id));
        metrics.record(execution.success, execution.execution_time_ms, execution.timestamp);
        collection.upsert(&metrics)?;
        Ok(())
    }

    fn record_action_execution(
        &self,
        execution: &ActionExecution,
    ) -> Result<()> {
        let mut record = execution.clone();
        if record.id.is_empty() {
            record.id = utils::longid();
        }
        self.store.actions()?.create(&record)?;
        Ok(())
    }

    fn get_direction_metrics(
        &self,
        edge_id: &str,
        action_set_id: &str,
    ) -> Result<Option<DirectionMetrics>> {
        match self.store.edge_metrics()?.find(&DirectionMetrics::key(edge_id, action_set_id)) {
            Ok(metrics) => Ok(Some(metrics)),
            Err(NavflowError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn get_node_metrics(
        &self,
        tree_id: &str,
        node_id: &str,
    ) -> Result<Option<NodeMetricsSummary>> {
        match self.store.node_metrics()?.find(&NodeMetricsSummary::key(tree_id, node_id)) {
            Ok(metrics) => Ok(Some(metrics)),
            Err(NavflowError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
