//! # Navflow
//!
//! Navflow is the navigation and execution core of a device test-automation platform.
//! A navigation tree describes the screens of a device UI (nodes) and the transitions
//! between them (edges carrying forward/backward action sets). Navflow finds the most
//! reliable path between two screens and drives a device along it.
//!
//! ## Core Features
//!
//! - **Weighted Pathfinding**: Dijkstra over directed action sets, weighted by historical success rate and latency
//! - **Escalating Execution**: main, retry and failure action lists with per-action iteration
//! - **Verification Gating**: destination checks run after every transition, first failure aborts
//! - **Plan Orchestration**: sync or async execution of navigation/action/verification/wait plans
//! - **Device Exclusivity**: fail-fast device leases with bounded lifetime
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use navflow::{Device, EngineBuilder, TreeModel};
//!
//! let engine = EngineBuilder::new().build()?;
//! engine.launch();
//!
//! let tree = TreeModel::from_json(json_str)?;
//! engine.deploy_tree(&tree)?;
//! engine.register_device(Device::new("stb-1").with_channel(remote));
//!
//! let path = engine.find_path(&tree.id, "live", Some("home"))?;
//! let result = engine.execute_path("stb-1", &path).await?;
//! ```

mod builder;
mod common;
mod config;
mod device;
mod dispatcher;
mod engine;
mod error;
mod events;
mod executor;
mod metrics;
mod model;
mod pathfinder;
mod plan;
mod runtime;
mod store;
mod tree;
mod utils;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use common::Params;
pub use config::{Config, DeviceConfig, ExecutionConfig, PlannerConfig, StoreConfig};
pub use device::{CapabilityChannel, ChannelOutput, Device, DeviceLease, DeviceLocks, VerificationBackend, VerificationOutput, classify};
pub use dispatcher::{ExecutionMode, ExecutionOptions, PlanExecution, PlanReport, StepResult};
pub use engine::Engine;
pub use error::{ErrorKind, NavflowError};
pub use events::{ExecutionEvent, Message, RunEvent};
pub use executor::{
    ActionBatchResult, ActionExecutor, ActionPhase, ActionResult, IterationResult, NavigationExecutor, PathResult, StepError, TransitionResult, VerificationResult,
};
pub use metrics::{ActionExecution, DirectionMetrics, EdgeExecution, MetricsSink, NodeExecution, NodeMetricsSummary, StoreMetrics};
pub use model::*;
pub use pathfinder::{Pathfinder, Transition, TransitionKind, WeightConfig};
pub use plan::PlanGenerator;
pub use runtime::{Channel, ChannelEvent, ChannelOptions, Context, Run, RunId};
pub use store::{MemStore, RunState, RunStatus, Store};
pub use tree::{Edge, EdgeDirection, Forest, Node, Position, Tree};

/// Result type alias for Navflow operations.
pub type Result<T> = std::result::Result<T, NavflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
