use serde::{Deserialize, Serialize};

use crate::metrics::DirectionMetrics;

/// Fixed-point scale of arc weights.
pub(crate) const WEIGHT_SCALE: f64 = 1000.0;

/// Parameters of the arc weight formula.
///
/// `weight = 1 + reliability_factor * (1 - success_rate) + latency_factor * min(avg_latency / latency_ceiling, 1)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// weight of an arc without execution history
    pub default_weight: f64,
    /// penalty per unit of failure rate
    pub reliability_factor: f64,
    /// penalty at or above the latency ceiling
    pub latency_factor: f64,
    /// latency at which the latency penalty saturates
    pub latency_ceiling_ms: u64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            default_weight: 1.5,
            reliability_factor: 4.0,
            latency_factor: 1.0,
            latency_ceiling_ms: 10_000,
        }
    }
}

impl WeightConfig {
    /// Weight of an arc given its recorded metrics.
    pub fn weight(
        &self,
        metrics: Option<&DirectionMetrics>,
    ) -> f64 {
        let Some(metrics) = metrics.filter(|m| m.total_executions > 0) else {
            return self.default_weight;
        };

        let success_rate = metrics.success_rate.clamp(0.0, 1.0);
        let latency = if self.latency_ceiling_ms == 0 {
            1.0
        } else {
            (metrics.avg_execution_time_ms.max(0.0) / self.latency_ceiling_ms as f64).min(1.0)
        };

        1.0 + self.reliability_factor * (1.0 - success_rate) + self.latency_factor * latency
    }

    /// Weight in fixed point, so path costs compare exactly.
    pub(crate) fn fixed_weight(
        &self,
        metrics: Option<&DirectionMetrics>,
    ) -> u64 {
        (self.weight(metrics).max(0.0) * WEIGHT_SCALE).round() as u64
    }
}
