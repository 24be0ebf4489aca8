use crate::store::{
    data::{DirectionMetrics, NodeMetricsSummary},
    db::mem::DbDocument,
};

impl DbDocument for DirectionMetrics {
    fn id(&self) -> String {
        DirectionMetrics::key(&self.edge_id, &self.action_set_id)
    }
}

impl DbDocument for NodeMetricsSummary {
    fn id(&self) -> String {
        NodeMetricsSummary::key(&self.tree_id, &self.node_id)
    }
}
