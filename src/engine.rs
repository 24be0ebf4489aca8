//! Navigation engine - the main entry point for Navflow.
//!
//! The engine is the process-level registry of the navigation core:
//! - Deployed navigation trees and their subtree links
//! - Registered devices and their exclusive locks
//! - Tracked device positions
//! - Active plan runs and their persisted status
//! - The event channel and the metrics monitor

mod monitor;

use std::{
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use serde_json::Value;
use tokio::runtime::{Handle, Runtime};
use tracing::{info, warn};

use crate::{
    ChannelEvent, ChannelOptions, Config, NavflowError, Result, ShareLock,
    common::{MemCache, Queue, Shutdown},
    device::{Device, DeviceId, DeviceLease, DeviceLocks},
    dispatcher::{Dispatcher, ExecutionMode, ExecutionOptions, Navigator, PlanExecution},
    executor::{ActionBatchResult, ActionExecutor, PathResult},
    metrics::{MetricsSink, StoreMetrics},
    model::{Action, ExecutionPlan, TreeModel, Verification},
    pathfinder::{Pathfinder, Transition},
    plan::PlanGenerator,
    runtime::{Channel, Context, Run, RunId},
    store::{DbCollection, MemStore, RunStatus, Store},
    tree::{Forest, Position, Tree, TreeId},
    utils,
};

use monitor::Monitor;

/// Size of the queue for finished run notifications.
const RUN_COMPLETE_QUEUE_SIZE: usize = 100;

/// The navigation engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().build()?;
/// engine.launch();
///
/// engine.deploy_tree(&tree)?;
/// engine.register_device(device);
///
/// let report = engine.execute_plan("stb-1", "tv", plan, ExecutionOptions::default()).await?;
///
/// engine.shutdown();
/// ```
pub struct Engine {
    config: Config,
    /// Event channel for execution events.
    channel: Arc<Channel>,
    /// Run records and aggregated metrics.
    store: Arc<Store>,
    metrics: Arc<dyn MetricsSink>,
    /// Background monitor feeding the metrics sink.
    monitor: Monitor,

    forest: Forest,
    navigator: Arc<Navigator>,
    devices: ShareLock<HashMap<DeviceId, Device>>,
    locks: DeviceLocks,
    planner: Option<Arc<dyn PlanGenerator>>,

    /// Queue for receiving run completion notifications.
    runs_complete_queue: Arc<Queue<RunId>>,
    /// In-memory cache of active runs.
    runs: Arc<MemCache<RunId, Arc<Run>>>,

    running: Arc<AtomicBool>,
    handle: Handle,
    /// Runtime created by the builder, kept alive with the engine.
    _runtime: Option<Arc<Runtime>>,
    shutdown: Arc<Shutdown>,
}

impl Engine {
    pub(crate) fn new(
        config: Config,
        handle: Handle,
        runtime: Option<Arc<Runtime>>,
        metrics: Option<Arc<dyn MetricsSink>>,
        planner: Option<Arc<dyn PlanGenerator>>,
    ) -> Self {
        let store = Arc::new(Store::with_backend(&MemStore::with_config(&config.store)));
        let metrics = metrics.unwrap_or_else(|| Arc::new(StoreMetrics::new(store.clone())));

        let forest = Forest::new();
        let pathfinder = Arc::new(Pathfinder::new(forest.clone(), config.pathfinding.clone()).with_metrics(metrics.clone()));
        let navigator = Arc::new(Navigator::new(forest.clone(), pathfinder, config.execution.capture_screenshots));

        let channel = Arc::new(Channel::new(handle.clone()));
        let monitor = Monitor::new(metrics.clone(), channel.clone(), handle.clone());

        Self {
            channel,
            store,
            metrics,
            monitor,
            forest,
            navigator,
            devices: Arc::new(RwLock::new(HashMap::new())),
            locks: DeviceLocks::new(config.device.lock_ttl()),
            planner,
            runs_complete_queue: Queue::new(RUN_COMPLETE_QUEUE_SIZE),
            runs: Arc::new(MemCache::new(config.run_cache_size)),
            running: Arc::new(AtomicBool::new(false)),
            handle,
            _runtime: runtime,
            shutdown: Arc::new(Shutdown::new()),
            config,
        }
    }

    /// Starts the metrics monitor, the channel listener and run eviction.
    pub fn launch(&self) {
        if self.running.swap(true, Ordering::Relaxed) {
            return;
        }

        // Register handlers first, then start listening
        self.monitor.monitor();
        match ChannelEvent::channel(self.channel.clone(), ChannelOptions::default()) {
            Ok(events) => {
                let runs_complete_queue = self.runs_complete_queue.clone();
                events.on_event(move |e| {
                    if e.event.is_finished() {
                        let _ = runs_complete_queue.try_send(e.run_id.clone());
                    }
                });
            }
            Err(err) => warn!("run eviction disabled: {}", err),
        }
        self.channel.listen();

        let runs_complete_queue = self.runs_complete_queue.clone();
        let shutdown = self.shutdown.clone();
        let runs = self.runs.clone();
        self.handle.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Some(run_id) = runs_complete_queue.next_async() => {
                        runs.remove(&run_id);
                    }
                }
            }
        });
        info!("engine launched");
    }

    /// Cancels active runs and stops background tasks.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        self.shutdown.shutdown();
        for (_, run) in self.runs.iter() {
            run.cancel();
        }
        self.monitor.stop();
        self.channel.shutdown();
        info!("engine shut down");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validates and registers a navigation tree, replacing any previous version.
    pub fn deploy_tree(
        &self,
        model: &TreeModel,
    ) -> Result<()> {
        let tree = Tree::try_from(model)?;
        info!("deploying tree {} ({} nodes, {} edges)", tree.id(), tree.node_count(), tree.edge_count());
        self.forest.register(tree)
    }

    pub fn tree(
        &self,
        tree_id: &str,
    ) -> Result<Arc<Tree>> {
        self.forest.get(tree_id).ok_or_else(|| NavflowError::NotFound(format!("tree {}", tree_id)))
    }

    pub fn trees(&self) -> Vec<TreeId> {
        self.forest.tree_ids()
    }

    pub fn add_verification(
        &self,
        tree_id: &str,
        node_id: &str,
        verification: Verification,
    ) -> Result<()> {
        self.forest.update(tree_id, |tree| tree.add_verification(node_id, verification))
    }

    pub fn remove_verification(
        &self,
        tree_id: &str,
        node_id: &str,
        index: usize,
    ) -> Result<Verification> {
        self.forest.update(tree_id, |tree| tree.remove_verification(node_id, index))
    }

    /// Registers a device, replacing one with the same id.
    pub fn register_device(
        &self,
        device: Device,
    ) {
        info!("registering device {} ({:?})", device.id(), device.kinds());
        self.devices.write().unwrap_or_else(PoisonError::into_inner).insert(device.id().to_string(), device);
    }

    pub fn device(
        &self,
        device_id: &str,
    ) -> Result<Device> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner).get(device_id).cloned().ok_or_else(|| NavflowError::NotFound(format!("device {}", device_id)))
    }

    /// Takes exclusive control of a device; fails fast with `DeviceBusy`.
    pub fn acquire_device(
        &self,
        device_id: &str,
    ) -> Result<DeviceLease> {
        self.device(device_id)?;
        self.locks.acquire(device_id, &uuid::Uuid::new_v4().to_string())
    }

    /// Last known position of a device in a tree, or the tree root.
    pub fn position(
        &self,
        device_id: &str,
        tree_id: &str,
    ) -> Result<Position> {
        self.navigator.position(device_id, tree_id)
    }

    /// Finds the best path to `target_node_id`, starting at the tree root when
    /// `current_node_id` is not given.
    pub fn find_path(
        &self,
        tree_id: &str,
        target_node_id: &str,
        current_node_id: Option<&str>,
    ) -> Result<Vec<Transition>> {
        let tree = self.forest.tree(tree_id)?;
        let current = current_node_id.unwrap_or(tree.root_node_id());
        self.navigator.pathfinder().find_path(tree_id, current, target_node_id)
    }

    /// Executes a precomputed path while holding the device lock.
    ///
    /// The tracked device position is left untouched; use [`Engine::navigate`] for
    /// position-aware navigation.
    pub async fn execute_path(
        &self,
        device_id: &str,
        path: &[Transition],
    ) -> Result<PathResult> {
        let (device, ctx, _lease) = self.session(device_id)?;
        Ok(self.navigator.executor(device, ctx).execute_path(path).await)
    }

    /// Navigates a device from its tracked position to `target` (node id or label).
    pub async fn navigate(
        &self,
        device_id: &str,
        tree_id: &str,
        target: &str,
    ) -> Result<PathResult> {
        let (device, ctx, _lease) = self.session(device_id)?;
        self.navigator.navigate(&device, ctx, tree_id, target).await
    }

    /// Executes an action batch with main/retry/failure escalation.
    pub async fn execute_actions(
        &self,
        device_id: &str,
        actions: &[Action],
        retry_actions: &[Action],
        failure_actions: &[Action],
    ) -> Result<ActionBatchResult> {
        let (device, ctx, _lease) = self.session(device_id)?;
        Ok(ActionExecutor::new(device, ctx).execute_actions(actions, retry_actions, failure_actions).await)
    }

    /// Executes a plan on a device.
    ///
    /// In sync mode the report is returned once the run ends; in async mode the run is
    /// spawned and its id returned immediately. Device and tree lookups and the device
    /// lock are checked before the run starts.
    pub async fn execute_plan(
        &self,
        device_id: &str,
        tree_id: &str,
        plan: ExecutionPlan,
        options: ExecutionOptions,
    ) -> Result<PlanExecution> {
        let mode = options.mode;
        let (run, dispatcher) = self.prepare(device_id, tree_id, options)?;
        match mode {
            ExecutionMode::Sync => Ok(PlanExecution::Completed(dispatcher.run_plan(plan).await)),
            ExecutionMode::Async => {
                self.handle.spawn(dispatcher.run_plan(plan));
                Ok(PlanExecution::Started(run.id()))
            }
        }
    }

    /// Generates a plan for `prompt` with the configured generator, then executes it.
    pub async fn execute_task(
        &self,
        device_id: &str,
        tree_id: &str,
        prompt: &str,
        context: Value,
        options: ExecutionOptions,
    ) -> Result<PlanExecution> {
        let planner = self.planner.clone().ok_or_else(|| NavflowError::Engine("no plan generator configured".to_string()))?;
        let deadline = self.config.planner.generation_timeout();
        let mode = options.mode;
        let (run, dispatcher) = self.prepare(device_id, tree_id, options)?;

        let task = dispatcher.run_task(planner, prompt.to_string(), context, deadline);
        match mode {
            ExecutionMode::Sync => Ok(PlanExecution::Completed(task.await)),
            ExecutionMode::Async => {
                self.handle.spawn(task);
                Ok(PlanExecution::Started(run.id()))
            }
        }
    }

    /// Gets an active run by its id.
    pub fn get_run(
        &self,
        run_id: &str,
    ) -> Option<Arc<Run>> {
        self.runs.get(&run_id.to_string())
    }

    /// Status of an active or finished run.
    pub fn get_run_status(
        &self,
        run_id: &str,
    ) -> Result<RunStatus> {
        if let Some(run) = self.get_run(run_id) {
            return Ok(run.status());
        }
        self.store.load_run(run_id).map_err(|_| NavflowError::NotFound(format!("run {}", run_id)))
    }

    /// Requests cancellation of a run; a finished run is left as is.
    pub fn cancel_run(
        &self,
        run_id: &str,
    ) -> Result<()> {
        match self.get_run(run_id) {
            Some(run) => {
                run.cancel();
                Ok(())
            }
            None => self.get_run_status(run_id).map(|_| ()),
        }
    }

    /// Drops every trace of a run; an active run is cancelled first.
    pub fn forget_run(
        &self,
        run_id: &str,
    ) -> Result<bool> {
        if let Some(run) = self.get_run(run_id) {
            run.cancel();
            self.runs.remove(&run_id.to_string());
        }
        self.store.runs()?.delete(run_id)
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    pub fn metrics(&self) -> Arc<dyn MetricsSink> {
        self.metrics.clone()
    }

    fn ensure_running(&self) -> Result<()> {
        if !self.is_running() {
            return Err(NavflowError::Engine("engine is not running".to_string()));
        }
        Ok(())
    }

    /// Device, context and lease for one ad-hoc execution.
    fn session(
        &self,
        device_id: &str,
    ) -> Result<(Device, Arc<Context>, DeviceLease)> {
        self.ensure_running()?;
        let device = self.device(device_id)?;
        let token = uuid::Uuid::new_v4().to_string();
        let lease = self.locks.acquire(device_id, &token)?;
        let ctx = Arc::new(Context::new(token, device_id, self.channel.clone()));
        Ok((device, ctx, lease))
    }

    fn prepare(
        &self,
        device_id: &str,
        tree_id: &str,
        options: ExecutionOptions,
    ) -> Result<(Arc<Run>, Dispatcher)> {
        self.ensure_running()?;
        self.forest.tree(tree_id)?;
        let device = self.device(device_id)?;

        let run_id = utils::longid();
        let lease = self.locks.acquire(device_id, &run_id)?;
        let ctx = Arc::new(Context::new(run_id.clone(), device_id, self.channel.clone()));
        let run = Run::new(ctx, tree_id, self.store.clone());
        self.runs.set(run_id, run.clone());

        let dispatcher = Dispatcher::new(run.clone(), device, tree_id, self.navigator.clone(), options, lease);
        Ok((run, dispatcher))
    }
}
