use std::sync::Arc;

use crate::{
    common::Shutdown,
    events::{ExecutionEvent, Message},
    runtime::{Channel, RunId},
};

/// Execution context shared by everything working for one run.
#[derive(Clone)]
pub struct Context {
    run_id: RunId,
    device_id: String,
    channel: Arc<Channel>,

    cancel: Arc<Shutdown>,
}

impl Context {
    pub fn new(
        run_id: RunId,
        device_id: &str,
        channel: Arc<Channel>,
    ) -> Self {
        Self {
            run_id,
            device_id: device_id.to_string(),
            channel,
            cancel: Arc::new(Shutdown::new()),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id.to_owned()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    /// Publishes an event for this run.
    pub fn emit(
        &self,
        event: ExecutionEvent,
    ) {
        self.channel.emit(Message {
            run_id: self.run_id.clone(),
            device_id: self.device_id.clone(),
            event,
        });
    }

    /// Requests cancellation; observed between plan steps.
    pub fn cancel(&self) {
        self.cancel.shutdown();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_terminated()
    }

    pub fn wait_cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        self.cancel.wait()
    }
}
