use std::time::Duration;

use envconfig::Envconfig;
use lifecycle_common::config::{ensure_min_duration, ensure_range};
use lifecycle_common::{Binding, ConfigError, EnvDuration, FlexBool};

#[derive(Envconfig, Clone, Debug)]
pub struct WorkerConfig {
    #[envconfig(from = "WORKER_INTERVAL", default = "30s")]
    pub interval: EnvDuration,

    #[envconfig(from = "WORKER_MAX_JOBS", default = "100")]
    pub max_jobs: usize,

    #[envconfig(from = "WORKER_ENABLE_PROCESSING", default = "true")]
    pub enable_processing: FlexBool,
}

impl Binding for WorkerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_min_duration("WORKER_INTERVAL", self.interval, Duration::from_secs(1))?;
        ensure_range("WORKER_MAX_JOBS", self.max_jobs, 1, 1000)
    }
}
