use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{NavflowError, Result, pathfinder::WeightConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// number of async worker threads, range [1, 32768), defaults to 16
    pub async_worker_thread_number: u16,
    /// number of run handles kept in memory
    pub run_cache_size: usize,
    /// device lock config
    pub device: DeviceConfig,
    /// plan generation config
    pub planner: PlannerConfig,
    /// edge weight parameters
    pub pathfinding: WeightConfig,
    /// execution config
    pub execution: ExecutionConfig,
    /// in-memory store retention
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// lifetime of a device lock in seconds
    pub lock_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// hard deadline for plan generation in milliseconds
    pub generation_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// take best-effort screenshots around each transition
    pub capture_screenshots: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// finished run statuses kept for polling, oldest dropped first
    pub run_history_size: usize,
    /// action executions kept in the action log, oldest dropped first
    pub action_log_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_worker_thread_number: 16,
            run_cache_size: 2048,
            device: DeviceConfig::default(),
            planner: PlannerConfig::default(),
            pathfinding: WeightConfig::default(),
            execution: ExecutionConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            run_history_size: 4096,
            action_log_size: 10_000,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: 600,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            generation_timeout_ms: 60_000,
        }
    }
}

impl DeviceConfig {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

impl PlannerConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| NavflowError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        if config.async_worker_thread_number == 0 {
            return Err(NavflowError::Config("async_worker_thread_number must be at least 1".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use crate::Config;

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        async_worker_thread_number = 4
        [device]
        lock_ttl_secs = 30

        [planner]
        generation_timeout_ms = 1500

        [pathfinding]
        default_weight = 2.0

        [execution]
        capture_screenshots = true

        [store]
        action_log_size = 500
        "#;
        let config = Config::load_from_str(toml_str).unwrap();
        assert_eq!(config.async_worker_thread_number, 4);
        assert_eq!(config.device.lock_ttl_secs, 30);
        assert_eq!(config.planner.generation_timeout().as_millis(), 1500);
        assert_eq!(config.pathfinding.default_weight, 2.0);
        assert_eq!(config.pathfinding.reliability_factor, 4.0);
        assert!(config.execution.capture_screenshots);
        assert_eq!(config.run_cache_size, 2048);
        assert_eq!(config.store.action_log_size, 500);
        assert_eq!(config.store.run_history_size, 4096);
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.async_worker_thread_number, 16);
        assert_eq!(config.planner.generation_timeout_ms, 60_000);

        assert!(Config::load_from_str("async_worker_thread_number = 0").is_err());
        assert!(Config::load_from_str("async_worker_thread_number = \"many\"").is_err());
    }
}
