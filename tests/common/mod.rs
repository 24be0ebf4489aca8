//! Shared doubles and fixtures for engine integration tests.
#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use navflow::{
    ActionExecution, ActionType, CapabilityChannel, ChannelOutput, Config, Device, DirectionMetrics, EdgeExecution, Engine, EngineBuilder, ExecutionPlan, MetricsSink,
    NavflowError, NodeExecution, NodeMetricsSummary, Params, PlanGenerator, Result, RunStatus, TreeModel, Verification, VerificationBackend, VerificationOutput,
};
use serde_json::Value;
use tokio::runtime::Handle;

pub const DEVICE: &str = "stb-1";
pub const TREE: &str = "tv";

/// Remote control that records every call as `command` or `command:key`.
#[derive(Default)]
pub struct RemoteChannel {
    failing: Vec<String>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl RemoteChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(
        mut self,
        call: &str,
    ) -> Self {
        self.failing.push(call.to_string());
        self
    }

    pub fn with_delay(
        mut self,
        ms: u64,
    ) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl CapabilityChannel for RemoteChannel {
    fn kind(&self) -> ActionType {
        ActionType::Remote
    }

    fn supports(
        &self,
        _command: &str,
    ) -> bool {
        true
    }

    async fn invoke(
        &self,
        command: &str,
        params: &Params,
    ) -> Result<ChannelOutput> {
        let call = match params.get_str("key") {
            Some(key) => format!("{}:{}", command, key),
            None => command.to_string(),
        };
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.contains(&call) {
            return Ok(ChannelOutput::failed(format!("{} not acknowledged", call)));
        }
        Ok(ChannelOutput::success())
    }
}

/// Text checker that only fails on texts listed as missing.
#[derive(Default)]
pub struct TextVerifier {
    missing: Vec<String>,
    evaluated: Mutex<Vec<String>>,
}

impl TextVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing(
        mut self,
        text: &str,
    ) -> Self {
        self.missing.push(text.to_string());
        self
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl VerificationBackend for TextVerifier {
    async fn evaluate(
        &self,
        verification: &Verification,
    ) -> Result<VerificationOutput> {
        let text = verification.params.get_str("text").unwrap_or_default();
        self.evaluated.lock().unwrap_or_else(PoisonError::into_inner).push(text.clone());
        if self.missing.contains(&text) {
            return Ok(VerificationOutput::failed(format!("'{}' not on screen", text)));
        }
        Ok(VerificationOutput::passed())
    }
}

/// Plan generator answering with a fixed plan after a delay.
pub struct StaticPlanner {
    plan: ExecutionPlan,
    delay: Duration,
}

impl StaticPlanner {
    pub fn new(plan: ExecutionPlan) -> Self {
        Self {
            plan,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(
        mut self,
        ms: u64,
    ) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

#[async_trait]
impl PlanGenerator for StaticPlanner {
    async fn generate(
        &self,
        prompt: &str,
        _context: &Value,
    ) -> Result<ExecutionPlan> {
        if prompt.is_empty() {
            return Err(NavflowError::PlanGenerationFailed("empty prompt".to_string()));
        }
        tokio::time::sleep(self.delay).await;
        Ok(self.plan.clone())
    }
}

/// Metrics backend that is down: every call fails.
#[derive(Default)]
pub struct BrokenMetrics {
    writes: Mutex<usize>,
}

impl BrokenMetrics {
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refuse<T>(&self) -> Result<T> {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Err(NavflowError::Store("metrics backend unavailable".to_string()))
    }
}

impl MetricsSink for BrokenMetrics {
    fn record_edge_execution(
        &self,
        _execution: &EdgeExecution,
    ) -> Result<()> {
        self.refuse()
    }

    fn record_node_execution(
        &self,
        _execution: &NodeExecution,
    ) -> Result<()> {
        self.refuse()
    }

    fn record_action_execution(
        &self,
        _execution: &ActionExecution,
    ) -> Result<()> {
        self.refuse()
    }

    fn get_direction_metrics(
        &self,
        _edge_id: &str,
        _action_set_id: &str,
    ) -> Result<Option<DirectionMetrics>> {
        Err(NavflowError::Store("metrics backend unavailable".to_string()))
    }

    fn get_node_metrics(
        &self,
        _tree_id: &str,
        _node_id: &str,
    ) -> Result<Option<NodeMetricsSummary>> {
        Err(NavflowError::Store("metrics backend unavailable".to_string()))
    }
}

/// `home -> settings -> live`; settings carries a text verification.
pub fn tv_tree() -> TreeModel {
    TreeModel::from_json(
        r#"{
            "id": "tv",
            "name": "TV main menu",
            "root_node_id": "home",
            "nodes": [
                {"id": "home", "label": "Home", "type": "entry"},
                {"id": "settings", "label": "Settings", "type": "menu", "verifications": [
                    {"verification_type": "text", "command": "waitForTextToAppear", "params": {"text": "Settings"}}
                ]},
                {"id": "live", "label": "Live TV"}
            ],
            "edges": [
                {"id": "e_home_settings", "source": "home", "target": "settings", "action_sets": [
                    {"id": "home_to_settings", "actions": [{"command": "press_key", "params": {"key": "DOWN"}}]},
                    {"id": "settings_to_home", "actions": [{"command": "press_key", "params": {"key": "UP"}}]}
                ]},
                {"id": "e_settings_live", "source": "settings", "target": "live", "action_sets": [
                    {"id": "settings_to_live", "actions": [
                        {"command": "press_key", "params": {"key": "BACK"}},
                        {"command": "execute_navigation"}
                    ]},
                    {"id": "live_to_settings", "actions": [{"command": "press_key", "params": {"key": "MENU"}}]}
                ]}
            ]
        }"#,
    )
    .expect("tree fixture")
}

/// Launched engine on the current runtime with the tv tree and one device.
pub fn engine(
    config: Config,
    channel: Arc<RemoteChannel>,
    verifier: Arc<TextVerifier>,
    planner: Option<Arc<dyn PlanGenerator>>,
) -> Engine {
    let mut builder = EngineBuilder::new().config(config);
    if let Some(planner) = planner {
        builder = builder.planner(planner);
    }
    launch(builder, channel, verifier)
}

/// Launches `builder` on the current runtime with the tv tree and one device.
pub fn launch(
    builder: EngineBuilder,
    channel: Arc<RemoteChannel>,
    verifier: Arc<TextVerifier>,
) -> Engine {
    let engine = builder.handle(Handle::current()).build().expect("engine");
    engine.launch();

    engine.deploy_tree(&tv_tree()).expect("deploy");
    engine.register_device(Device::new(DEVICE).with_name("living room box").with_channel(channel).with_verifier(verifier));
    engine
}

/// Polls a run until it reaches a terminal state.
pub async fn wait_finished(
    engine: &Engine,
    run_id: &str,
) -> RunStatus {
    for _ in 0..200 {
        let status = engine.get_run_status(run_id).expect("run status");
        if status.state.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("run {} did not finish", run_id);
}
