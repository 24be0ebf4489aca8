use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Aggregated history of one edge direction (edge walked with one action set).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DirectionMetrics {
    pub edge_id: String,
    pub action_set_id: String,

    pub total_executions: u64,
    pub success_count: u64,
    /// rolling average in milliseconds
    pub avg_execution_time_ms: f64,
    pub success_rate: f64,
    pub updated_at: i64,
}

impl DbCollectionIden for DirectionMetrics {
    fn iden() -> StoreIden {
        StoreIden::EdgeMetrics
    }
}

impl DirectionMetrics {
    pub fn new(
        edge_id: &str,
        action_set_id: &str,
    ) -> Self {
        Self {
            edge_id: edge_id.to_string(),
            action_set_id: action_set_id.to_string(),
            total_executions: 0,
            success_count: 0,
            avg_execution_time_ms: 0.0,
            success_rate: 0.0,
            updated_at: 0,
        }
    }

    pub fn key(
        edge_id: &str,
        action_set_id: &str,
    ) -> String {
        format!("{}:{}", edge_id, action_set_id)
    }

    /// Folds one execution into the aggregate.
    pub fn record(
        &mut self,
        success: bool,
        execution_time_ms: u64,
        timestamp: i64,
    ) {
        (self.total_executions, self.success_count, self.avg_execution_time_ms, self.success_rate) =
            fold(self.total_executions, self.success_count, self.avg_execution_time_ms, success, execution_time_ms);
        self.updated_at = timestamp;
    }
}

/// Aggregated verification history of one node.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NodeMetricsSummary {
    pub tree_id: String,
    pub node_id: String,

    pub total_executions: u64,
    pub success_count: u64,
    pub avg_execution_time_ms: f64,
    pub success_rate: f64,
    pub updated_at: i64,
}

impl DbCollectionIden for NodeMetricsSummary {
    fn iden() -> StoreIden {
        StoreIden::NodeMetrics
    }
}

impl NodeMetricsSummary {
    pub fn new(
        tree_id: &str,
        node_id: &str,
    ) -> Self {
        Self {
            tree_id: tree_id.to_string(),
            node_id: node_id.to_string(),
            total_executions: 0,
            success_count: 0,
            avg_execution_time_ms: 0.0,
            success_rate: 0.0,
            updated_at: 0,
        }
    }

    pub fn key(
        tree_id: &str,
        node_id: &str,
    ) -> String {
        format!("{}:{}", tree_id, node_id)
    }

    pub fn record(
        &mut self,
        success: bool,
        execution_time_ms: u64,
        timestamp: i64,
    ) {
        (self.total_executions, self.success_count, self.avg_execution_time_ms, self.success_rate) =
            fold(self.total_executions, self.success_count, self.avg_execution_time_ms, success, execution_time_ms);
        self.updated_at = timestamp;
    }
}

fn fold(
    total: u64,
    success_count: u64,
    avg_ms: f64,
    success: bool,
    execution_time_ms: u64,
) -> (u64, u64, f64, f64) {
    let total_next = total + 1;
    let success_next = success_count + u64::from(success);
    let avg_next = (avg_ms * total as f64 + execution_time_ms as f64) / total_next as f64;
    (total_next, success_next, avg_next, success_next as f64 / total_next as f64)
}

#[cfg(test)]
mod test {
    use super::DirectionMetrics;

    #[test]
    fn test_rolling_aggregate() {
        let mut metrics = DirectionMetrics::new("e1", "fwd");
        metrics.record(true, 100, 1);
        metrics.record(false, 300, 2);
        metrics.record(true, 200, 3);

        assert_eq!(metrics.total_executions, 3);
        assert_eq!(metrics.success_count, 2);
        assert_eq!(metrics.avg_execution_time_ms, 200.0);
        assert!((metrics.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.updated_at, 3);
    }
}
