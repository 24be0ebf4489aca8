use std::sync::Arc;

use tokio::{runtime::Handle, sync::broadcast::error::RecvError};
use tracing::warn;

use crate::{
    common::Shutdown,
    events::{ExecutionEvent, Message},
    metrics::MetricsSink,
    runtime::Channel,
};

/// Background consumer turning execution events into metrics.
///
/// Recording is best-effort: sink errors are logged and the event is dropped.
pub struct Monitor {
    metrics: Arc<dyn MetricsSink>,
    channel: Arc<Channel>,

    handle: Handle,
    shutdown: Arc<Shutdown>,
}

impl Monitor {
    pub fn new(
        metrics: Arc<dyn MetricsSink>,
        channel: Arc<Channel>,
        handle: Handle,
    ) -> Self {
        Self {
            metrics,
            channel,
            handle,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub fn monitor(&self) {
        // subscribe before returning so no event emitted afterwards is missed
        let mut event_queue = self.channel.event_queue().subscribe();
        let metrics = self.metrics.clone();
        let shutdown = self.shutdown.clone();

        self.handle.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    received = event_queue.recv() => match received {
                        Ok(message) => record(metrics.as_ref(), &message),
                        Err(RecvError::Lagged(skipped)) => warn!("metrics monitor lagged, {} events dropped", skipped),
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        self.shutdown.shutdown();
    }
}

fn record(
    metrics: &dyn MetricsSink,
    message: &Message,
) {
    let recorded = match &message.event {
        ExecutionEvent::Action(execution) => metrics.record_action_execution(execution),
        ExecutionEvent::Edge(execution) => metrics.record_edge_execution(execution),
        ExecutionEvent::Node(execution) => metrics.record_node_execution(execution),
        ExecutionEvent::Run(_) => Ok(()),
    };
    if let Err(err) = recorded {
        warn!("run {}: failed to record metrics: {}", message.run_id, err);
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use tokio::runtime::Handle;

    use crate::{
        events::{ExecutionEvent, Message},
        metrics::{EdgeExecution, MetricsSink, StoreMetrics},
        runtime::Channel,
        store::{MemStore, Store},
    };

    use super::Monitor;

    fn walked(success: bool) -> Message {
        Message {
            run_id: "run-1".to_string(),
            device_id: "stb-1".to_string(),
            event: ExecutionEvent::Edge(EdgeExecution {
                tree_id: "tv".to_string(),
                edge_id: "e1".to_string(),
                action_set_id: "home_to_settings".to_string(),
                success,
                execution_time_ms: 40,
                message: None,
                timestamp: 1,
            }),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_edge_events_become_metrics() {
        let metrics = Arc::new(StoreMetrics::new(Arc::new(Store::with_backend(&MemStore::new()))));
        let channel = Arc::new(Channel::new(Handle::current()));
        let monitor = Monitor::new(metrics.clone(), channel.clone(), Handle::current());
        monitor.monitor();

        channel.emit(walked(true));
        channel.emit(walked(false));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let direction = metrics.get_direction_metrics("e1", "home_to_settings").unwrap().unwrap();
        assert_eq!(direction.total_executions, 2);
        assert_eq!(direction.success_count, 1);
        assert_eq!(direction.success_rate, 0.5);
        monitor.stop();
    }
}
