use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::{
    ShareLock,
    common::Shutdown,
    events::{ExecutionEvent, RunEvent, RunFailedEvent},
    executor::StepError,
    runtime::Context,
    store::{RunState, RunStatus, Store},
};

/// run id
pub type RunId = String;

/// Handle of one plan run.
///
/// Owns the in-memory status of the run and mirrors every change into the store, so
/// the status stays pollable after the handle is evicted.
pub struct Run {
    ctx: Arc<Context>,
    status: ShareLock<RunStatus>,
    store: Arc<Store>,

    done: Shutdown,
}

impl Run {
    pub(crate) fn new(
        ctx: Arc<Context>,
        tree_id: &str,
        store: Arc<Store>,
    ) -> Arc<Self> {
        let status = RunStatus::new(&ctx.run_id(), ctx.device_id(), tree_id);
        let run = Arc::new(Self {
            ctx,
            status: Arc::new(RwLock::new(status)),
            store,
            done: Shutdown::new(),
        });
        run.persist();
        run
    }

    pub fn id(&self) -> RunId {
        self.ctx.run_id()
    }

    pub fn device_id(&self) -> &str {
        self.ctx.device_id()
    }

    pub fn ctx(&self) -> Arc<Context> {
        self.ctx.clone()
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> RunStatus {
        self.status.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn state(&self) -> RunState {
        self.status.read().unwrap_or_else(PoisonError::into_inner).state
    }

    pub fn cancel(&self) {
        info!("run {} cancellation requested", self.id());
        self.ctx.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.done.is_terminated()
    }

    /// Waits until the run reaches a terminal state and returns its final status.
    pub async fn wait(&self) -> RunStatus {
        self.done.wait().await;
        self.status()
    }

    pub(crate) fn update(
        &self,
        f: impl FnOnce(&mut RunStatus),
    ) {
        {
            let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut status);
        }
        self.persist();
    }

    /// Moves to a non-terminal lifecycle state.
    pub(crate) fn set_state(
        &self,
        state: RunState,
    ) {
        self.update(|status| status.state = state);
        self.ctx.emit(ExecutionEvent::Run(RunEvent::State(state)));
    }

    /// Moves to a terminal state, publishes the outcome and wakes waiters.
    pub(crate) fn finish(
        &self,
        state: RunState,
        error: Option<StepError>,
    ) {
        let message = error.as_ref().map(|e| e.message.clone());
        self.update(|status| status.finish(state, error));
        info!("run {} finished: {}", self.id(), state.as_ref());

        let event = match state {
            RunState::Completed => RunEvent::Completed,
            RunState::Cancelled => RunEvent::Cancelled,
            _ => RunEvent::Failed(RunFailedEvent {
                error: message.unwrap_or_else(|| "run failed".to_string()),
            }),
        };
        self.ctx.emit(ExecutionEvent::Run(event));
        self.done.shutdown();
    }

    fn persist(&self) {
        let status = self.status();
        if let Err(err) = self.store.save_run(&status) {
            warn!("failed to persist run {}: {}", status.run_id, err);
        }
    }
}
