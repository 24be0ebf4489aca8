mod action;
mod metrics;
mod run;

pub use action::ActionExecution;
pub use metrics::{DirectionMetrics, NodeMetricsSummary};
pub use run::{RunState, RunStatus};
