//! Step-by-step plan execution for one run.
//!
//! A dispatcher is created per run and consumed by it. It holds the device lease for
//! the whole run, so the device is released however the run ends.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    ErrorKind, NavflowError, Result,
    device::{Device, DeviceLease},
    dispatcher::{ExecutionOptions, Navigator, PlanReport, StepResult},
    events::{ExecutionEvent, RunEvent, RunStepEvent},
    executor::{ActionExecutor, PathResult, StepError, sleep_ms},
    model::{Action, ActionType, ExecutionPlan, PlanStep, StepType},
    plan::{PlanGenerator, generate_plan},
    runtime::Run,
    store::RunState,
    utils,
};

const TARGET_KEYS: [&str; 3] = ["target_node", "target_node_id", "target_node_label"];

pub(crate) struct Dispatcher {
    run: Arc<Run>,
    device: Device,
    tree_id: String,
    navigator: Arc<Navigator>,
    options: ExecutionOptions,

    _lease: DeviceLease,
}

impl Dispatcher {
    pub fn new(
        run: Arc<Run>,
        device: Device,
        tree_id: &str,
        navigator: Arc<Navigator>,
        options: ExecutionOptions,
        lease: DeviceLease,
    ) -> Self {
        Self {
            run,
            device,
            tree_id: tree_id.to_string(),
            navigator,
            options,
            _lease: lease,
        }
    }

    /// Generates a plan for `prompt` and executes it.
    ///
    /// Timeout, generator failure, an infeasible plan and cancellation during generation
    /// all end the run before any step is executed.
    pub async fn run_task(
        self,
        planner: Arc<dyn PlanGenerator>,
        prompt: String,
        context: Value,
        deadline: Duration,
    ) -> PlanReport {
        let start = Instant::now();
        self.run.set_state(RunState::GeneratingPlan);

        let cancelled = self.run.ctx().wait_cancelled();
        let generated = tokio::select! {
            _ = cancelled => Err(NavflowError::Cancelled(format!("run {} cancelled during plan generation", self.run.id()))),
            plan = generate_plan(planner.as_ref(), &prompt, &context, deadline) => plan,
        };

        match generated {
            Ok(plan) => self.execute(plan, start).await,
            Err(err) => self.abort(err, start),
        }
    }

    /// Executes an already generated plan.
    pub async fn run_plan(
        self,
        plan: ExecutionPlan,
    ) -> PlanReport {
        self.execute(plan, Instant::now()).await
    }

    async fn execute(
        self,
        plan: ExecutionPlan,
        start: Instant,
    ) -> PlanReport {
        let total = plan.steps.len();
        self.run.update(|status| status.total_steps = total);
        self.run.set_state(RunState::Executing);
        info!("run {}: executing {} steps on device {}", self.run.id(), total, self.device.id());

        let mut steps: Vec<StepResult> = Vec::with_capacity(total);
        let mut error: Option<StepError> = None;
        let mut cancelled = false;

        for (index, step) in plan.steps.iter().enumerate() {
            if self.run.is_cancelled() {
                cancelled = true;
                break;
            }

            let result = self.execute_step(index, step).await;
            let success = result.success;
            if !success && error.is_none() {
                error = result.error.clone();
            }

            self.run.update(|status| status.record_step(result.clone()));
            self.run.ctx().emit(ExecutionEvent::Run(RunEvent::Step(RunStepEvent {
                index,
                success,
            })));
            steps.push(result);

            if !success && self.options.stop_on_first_error {
                debug!("run {}: stopping after failed step {}", self.run.id(), index);
                break;
            }
        }

        self.run.set_state(RunState::Summarizing);
        let skipped = total - steps.len();
        let success = error.is_none() && skipped == 0;
        let state = if cancelled {
            if error.is_none() {
                error = Some(StepError::new(ErrorKind::Cancelled, format!("cancelled after {} of {} steps", steps.len(), total)));
            }
            RunState::Cancelled
        } else if success {
            RunState::Completed
        } else {
            RunState::Failed
        };
        self.run.finish(state, error.clone());

        PlanReport {
            run_id: self.run.id(),
            success,
            steps,
            skipped,
            error,
            state,
            execution_time_ms: utils::time::elapsed_millis(start),
        }
    }

    fn abort(
        self,
        err: NavflowError,
        start: Instant,
    ) -> PlanReport {
        let state = if err.kind() == ErrorKind::Cancelled { RunState::Cancelled } else { RunState::Failed };
        warn!("run {} aborted: {}", self.run.id(), err);

        let error = StepError::from(&err);
        self.run.finish(state, Some(error.clone()));

        PlanReport {
            run_id: self.run.id(),
            success: false,
            steps: vec![],
            skipped: 0,
            error: Some(error),
            state,
            execution_time_ms: utils::time::elapsed_millis(start),
        }
    }

    async fn execute_step(
        &self,
        index: usize,
        step: &PlanStep,
    ) -> StepResult {
        let start = Instant::now();
        let step_type = step.kind();
        debug!("run {}: step {} [{}] {}", self.run.id(), index, step_type.as_ref(), step.command);

        let mut result = StepResult {
            index,
            step_type,
            command: step.command.clone(),
            description: step.description.clone(),
            success: false,
            error: None,
            path: None,
            actions: None,
            execution_time_ms: 0,
        };

        match step_type {
            StepType::Navigation => match self.navigate(step).await {
                Ok(path) => {
                    result.success = path.success;
                    result.error = path.error.clone();
                    result.path = Some(path);
                }
                Err(err) => result.error = Some(err.into()),
            },
            StepType::Action | StepType::Verification => {
                let action = step_action(step, step_type);
                let batch = ActionExecutor::new(self.device.clone(), self.run.ctx()).execute_actions(&[action], &[], &[]).await;
                result.success = batch.success;
                if !batch.success {
                    let kind = if step_type == StepType::Verification { ErrorKind::VerificationFailed } else { ErrorKind::ActionFailed };
                    let reason = batch.results.iter().rev().find_map(|r| r.message.clone()).unwrap_or_else(|| "not successful".to_string());
                    result.error = Some(StepError::new(kind, format!("{}: {}", step.command, reason)));
                }
                result.actions = Some(batch);
            }
            StepType::Wait => {
                sleep_ms(step.params.get_millis("duration").unwrap_or(0)).await;
                result.success = true;
            }
        }

        result.execution_time_ms = utils::time::elapsed_millis(start);
        result
    }

    async fn navigate(
        &self,
        step: &PlanStep,
    ) -> Result<PathResult> {
        let target = TARGET_KEYS
            .iter()
            .find_map(|key| step.params.get_str(key))
            .ok_or_else(|| NavflowError::GraphInconsistency(format!("navigation step '{}' names no target node", step.command)))?;
        self.navigator.navigate(&self.device, self.run.ctx(), &self.tree_id, &target).await
    }
}

/// Single action standing in for an action or verification step.
fn step_action(
    step: &PlanStep,
    step_type: StepType,
) -> Action {
    let mut action = Action::new(step.command.clone());
    action.params = step.params.clone();
    action.iterator = step.params.get::<u32>("iterator");
    action.action_type = if step_type == StepType::Verification {
        Some(ActionType::Verification)
    } else {
        step.params.get_str("action_type").and_then(|hint| hint.parse::<ActionType>().ok())
    };
    action
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use tokio::runtime::Handle;

    use crate::{
        ErrorKind,
        device::{
            Device, DeviceLocks,
            testing::{ScriptedChannel, ScriptedVerifier},
        },
        dispatcher::{ExecutionOptions, Navigator},
        model::{Action, ActionSet, ActionType, EdgeModel, ExecutionPlan, NodeModel, PlanStep, StepType, TreeModel},
        pathfinder::{Pathfinder, WeightConfig},
        runtime::{Channel, Context, Run},
        store::{MemStore, RunState, Store},
        tree::{Forest, Position, Tree},
    };

    use super::Dispatcher;

    struct Fixture {
        navigator: Arc<Navigator>,
        store: Arc<Store>,
        locks: DeviceLocks,
        channel: Arc<Channel>,
    }

    fn key_set(
        id: &str,
        key: &str,
    ) -> ActionSet {
        ActionSet::new(id).with_action(Action::new("press_key").with_param("key", key))
    }

    fn fixture() -> Fixture {
        let tv = TreeModel {
            id: "tv".to_string(),
            name: "tv".to_string(),
            root_node_id: None,
            parent: None,
            nodes: vec![NodeModel::new("home", "Home"), NodeModel::new("settings", "Settings"), NodeModel::new("live", "Live TV")],
            edges: vec![
                EdgeModel::new("e1", "home", "settings").with_action_set(key_set("home_to_settings", "DOWN")).with_action_set(key_set("settings_to_home", "BACK")),
                EdgeModel::new("e2", "settings", "live").with_action_set(key_set("settings_to_live", "RIGHT")).with_action_set(key_set("live_to_settings", "LEFT")),
            ],
        };
        let forest = Forest::new();
        forest.register(Tree::try_from(&tv).unwrap()).unwrap();
        let pathfinder = Arc::new(Pathfinder::new(forest.clone(), WeightConfig::default()));

        Fixture {
            navigator: Arc::new(Navigator::new(forest, pathfinder, false)),
            store: Arc::new(Store::with_backend(&MemStore::new())),
            locks: DeviceLocks::new(Duration::from_secs(60)),
            channel: Arc::new(Channel::new(Handle::current())),
        }
    }

    impl Fixture {
        fn dispatcher(
            &self,
            run_id: &str,
            device: Device,
            options: ExecutionOptions,
        ) -> (Arc<Run>, Dispatcher) {
            let ctx = Arc::new(Context::new(run_id.to_string(), device.id(), self.channel.clone()));
            let run = Run::new(ctx, "tv", self.store.clone());
            let lease = self.locks.acquire(device.id(), run_id).unwrap();
            (run.clone(), Dispatcher::new(run, device, "tv", self.navigator.clone(), options, lease))
        }
    }

    fn device(channel: Arc<ScriptedChannel>) -> Device {
        Device::new("stb-1").with_channel(channel).with_verifier(Arc::new(ScriptedVerifier::new().fail("Missing")))
    }

    #[tokio::test]
    async fn test_plan_runs_every_step_kind() {
        let fx = fixture();
        let channel = Arc::new(ScriptedChannel::new(ActionType::Remote));
        let (run, dispatcher) = fx.dispatcher("run-1", device(channel.clone()), ExecutionOptions::default());

        let plan = ExecutionPlan::new(vec![
            PlanStep::navigation("Live TV"),
            PlanStep::verification("waitForTextToAppear").with_param("text", "LIVE"),
            PlanStep::action("press_key").with_param("key", "OK"),
            PlanStep::wait(1),
        ]);
        let report = dispatcher.run_plan(plan).await;

        assert!(report.success);
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.steps.len(), 4);
        assert_eq!(report.steps[0].path.as_ref().unwrap().transitions_completed, 2);
        assert_eq!(report.steps[1].step_type, StepType::Verification);
        assert_eq!(report.steps[1].actions.as_ref().unwrap().results[0].channel, ActionType::Verification);
        assert_eq!(channel.calls(), vec!["press_key:DOWN", "press_key:RIGHT", "press_key:OK"]);

        // position tracked for the next navigation
        assert_eq!(fx.navigator.position("stb-1", "tv").unwrap(), Position::new("tv", "live"));

        let status = run.status();
        assert_eq!(status.state, RunState::Completed);
        assert_eq!(status.current_step, 4);
        assert_eq!(status.progress_percentage, 100.0);
        assert_eq!(fx.store.load_run("run-1").unwrap().state, RunState::Completed);

        // lease released with the dispatcher
        assert!(!fx.locks.is_locked("stb-1"));
    }

    #[tokio::test]
    async fn test_stop_on_first_error() {
        let fx = fixture();
        let channel = Arc::new(ScriptedChannel::new(ActionType::Remote));
        let plan = ExecutionPlan::new(vec![
            PlanStep::verification("waitForTextToAppear").with_param("text", "Missing"),
            PlanStep::action("press_key").with_param("key", "OK"),
        ]);

        let (_, dispatcher) = fx.dispatcher("run-1", device(channel.clone()), ExecutionOptions::default());
        let report = dispatcher.run_plan(plan.clone()).await;
        assert!(!report.success);
        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.error.unwrap().kind, ErrorKind::VerificationFailed);
        assert!(channel.calls().is_empty());

        let (_, dispatcher) = fx.dispatcher("run-2", device(channel.clone()), ExecutionOptions::default().with_stop_on_first_error(false));
        let report = dispatcher.run_plan(plan).await;
        assert!(!report.success);
        assert_eq!(report.steps.len(), 2);
        assert!(report.steps[1].success);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.state, RunState::Failed);
    }

    #[tokio::test]
    async fn test_navigation_step_errors() {
        let fx = fixture();
        let channel = Arc::new(ScriptedChannel::new(ActionType::Remote));
        let plan = ExecutionPlan::new(vec![PlanStep::navigation("guide"), PlanStep::action("execute_navigation").with_param("note", "no target")]);

        let (_, dispatcher) = fx.dispatcher("run-1", device(channel), ExecutionOptions::default().with_stop_on_first_error(false));
        let report = dispatcher.run_plan(plan).await;

        assert_eq!(report.steps[0].error.as_ref().unwrap().kind, ErrorKind::GraphInconsistency);
        assert!(report.steps[0].path.is_none());
        assert_eq!(report.steps[1].step_type, StepType::Action);
    }

    #[tokio::test]
    async fn test_cancelled_between_steps() {
        let fx = fixture();
        let channel = Arc::new(ScriptedChannel::new(ActionType::Remote));
        let (run, dispatcher) = fx.dispatcher("run-1", device(channel.clone()), ExecutionOptions::default());

        run.cancel();
        let report = dispatcher.run_plan(ExecutionPlan::new(vec![PlanStep::action("press_key").with_param("key", "OK")])).await;

        assert!(!report.success);
        assert_eq!(report.state, RunState::Cancelled);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.error.unwrap().kind, ErrorKind::Cancelled);
        assert!(channel.calls().is_empty());
        assert!(run.is_finished());
    }
}
