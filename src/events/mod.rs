//! Event types for navigation and plan execution.
//!
//! Events are published on the engine channel while devices are driven. The engine
//! monitor turns execution events into metrics; user handlers subscribe through
//! [`ChannelEvent`](crate::ChannelEvent).

mod run;

pub use run::*;

use crate::{
    metrics::{ActionExecution, EdgeExecution, NodeExecution},
    runtime::RunId,
};

/// Top-level execution event.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Run lifecycle events (state changes, steps, completion).
    Run(RunEvent),
    /// One action was executed.
    Action(ActionExecution),
    /// One edge direction was walked.
    Edge(EdgeExecution),
    /// One node verification was evaluated.
    Node(NodeExecution),
}

/// Event message carrying its run and device context.
#[derive(Debug, Clone)]
pub struct Message {
    /// Run that produced this event; ad-hoc executions get their own id.
    pub run_id: RunId,
    /// Device being driven.
    pub device_id: String,
    /// The actual event data.
    pub event: ExecutionEvent,
}

impl ExecutionEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, ExecutionEvent::Run(RunEvent::Completed))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionEvent::Run(RunEvent::Failed(_)))
    }

    /// Whether the run reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, ExecutionEvent::Run(RunEvent::Completed | RunEvent::Failed(_) | RunEvent::Cancelled))
    }

    /// Whether the event feeds the metrics sink.
    pub fn is_metric(&self) -> bool {
        !matches!(self, ExecutionEvent::Run(_))
    }
}
