use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::{Config, Engine, NavflowError, Result, metrics::MetricsSink, plan::PlanGenerator};

/// Assembles an [`Engine`].
///
/// Without a handle or runtime the engine creates its own multi-thread runtime sized
/// by `async_worker_thread_number`.
#[derive(Default)]
pub struct EngineBuilder {
    config: Config,
    handle: Option<Handle>,
    rt: Option<Arc<Runtime>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    planner: Option<Arc<dyn PlanGenerator>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.config.async_worker_thread_number = n;
        self
    }

    /// Run on an existing runtime, e.g. `Handle::current()` inside async code.
    pub fn handle(
        mut self,
        handle: Handle,
    ) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    /// Replace the store-backed metrics sink.
    pub fn metrics(
        mut self,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn planner(
        mut self,
        planner: Arc<dyn PlanGenerator>,
    ) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn build(self) -> Result<Engine> {
        if self.config.async_worker_thread_number == 0 {
            return Err(NavflowError::Config("async_worker_thread_number must be at least 1".to_string()));
        }

        let (handle, runtime) = match (self.handle, self.rt) {
            (Some(handle), rt) => (handle, rt),
            (None, Some(rt)) => (rt.handle().clone(), Some(rt)),
            (None, None) => {
                let rt = Builder::new_multi_thread()
                    .worker_threads(self.config.async_worker_thread_number.into())
                    .enable_all()
                    .build()
                    .map_err(|e| NavflowError::Engine(format!("failed to build runtime: {}", e)))?;
                let rt = Arc::new(rt);
                (rt.handle().clone(), Some(rt))
            }
        };

        Ok(Engine::new(self.config, handle, runtime, self.metrics, self.planner))
    }
}

#[cfg(test)]
mod test {
    use crate::{Config, EngineBuilder};

    #[test]
    fn test_build_owns_runtime() {
        let engine = EngineBuilder::new().async_worker_thread_number(2).build().unwrap();
        engine.launch();
        assert!(engine.is_running());
        engine.shutdown();
        assert!(!engine.is_running());

        let mut config = Config::default();
        config.async_worker_thread_number = 0;
        assert!(EngineBuilder::new().config(config).build().is_err());
    }
}
