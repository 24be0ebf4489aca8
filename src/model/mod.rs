mod action;
mod edge;
mod node;
mod plan;
mod tree;
mod verification;

pub use action::{Action, ActionType};
pub use edge::{ActionSet, ActionSetDirection, EdgeModel};
pub use node::{NodeModel, NodeType};
pub use plan::{ExecutionPlan, PlanStep, StepType};
pub use tree::{ParentRef, TreeModel};
pub use verification::{Verification, VerificationType};
