use crate::store::RunState;

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// The run entered a new lifecycle state.
    State(RunState),
    /// A plan step finished.
    Step(RunStepEvent),
    Completed,
    Failed(RunFailedEvent),
    Cancelled,
}

impl RunEvent {
    pub fn str(&self) -> &str {
        match self {
            RunEvent::State(state) => state.as_ref(),
            RunEvent::Step(_) => "step",
            RunEvent::Completed => "completed",
            RunEvent::Failed(_) => "failed",
            RunEvent::Cancelled => "cancelled",
        }
    }
}

/// Event emitted after each plan step
#[derive(Debug, Clone, PartialEq)]
pub struct RunStepEvent {
    /// zero-based step index
    pub index: usize,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunFailedEvent {
    pub error: String,
}
