use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lifecycle_common::{
    Counters, LifecycleContext, RegisterError, RouteRegistrar, Service, ServiceHealth, StartError,
    StopError,
};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::error::QueueError;
use crate::handlers;
use crate::queue::{Job, JobCounts, JobQueue};
use crate::worker::WorkerTask;

pub const BASE_PATH: &str = "/api/worker";

pub const JOBS_CREATED: &str = "jobs_created";
pub const JOBS_PROCESSED: &str = "jobs_processed";

/// State shared between the lifecycle hooks, the background loop and the
/// request handlers.
pub struct WorkerState {
    pub config: WorkerConfig,
    queue: RwLock<JobQueue>,
    /// The launch number of the live loop, 0 while none runs.
    pub(crate) running: AtomicU64,
    launches: AtomicU64,
    pub counters: Counters,
}

impl WorkerState {
    fn new(config: WorkerConfig) -> Self {
        Self {
            queue: RwLock::new(JobQueue::new(config.max_jobs)),
            config,
            running: AtomicU64::new(0),
            launches: AtomicU64::new(0),
            counters: Counters::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) != 0
    }

    pub fn is_enabled(&self) -> bool {
        *self.config.enable_processing
    }

    pub async fn submit(&self, job_type: &str, data: &str) -> Result<Job, QueueError> {
        let job = self.queue.write().await.submit(job_type, data)?;

        self.counters.increment(JOBS_CREATED).await;
        metrics::counter!("worker_jobs_submitted_total", "type" => job.job_type.clone())
            .increment(1);
        info!(job_id = job.id, job_type = %job.job_type, "job submitted");
        Ok(job)
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.queue.read().await.jobs().to_vec()
    }

    /// Job counts and the processed total, read together so they agree.
    pub async fn stats(&self) -> (JobCounts, u64) {
        let queue = self.queue.read().await;
        let processed = self.counters.get(JOBS_PROCESSED).await;
        (queue.counts(), processed)
    }

    /// One processing step. Nothing is touched once `token` is cancelled, even if
    /// the step was already due.
    pub(crate) async fn process_jobs(&self, token: &CancellationToken) -> usize {
        let mut queue = self.queue.write().await;
        if token.is_cancelled() {
            return 0;
        }

        let processed = queue.complete_pending();
        if processed > 0 {
            self.counters.add(JOBS_PROCESSED, processed as u64).await;
            metrics::counter!("worker_jobs_processed_total").increment(processed as u64);
            info!(processed, "processed pending jobs");
        }
        processed
    }
}

/// A service running a periodic processing loop over an in-memory job queue.
pub struct WorkerService {
    state: Arc<WorkerState>,
    task: Mutex<Option<WorkerTask>>,
}

impl WorkerService {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            state: Arc::new(WorkerState::new(config)),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.state.config
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Total number of jobs completed by the background loop.
    pub async fn processed(&self) -> u64 {
        self.state.counters.get(JOBS_PROCESSED).await
    }

    pub async fn submit(&self, job_type: &str, data: &str) -> Result<Job, QueueError> {
        self.state.submit(job_type, data).await
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.state.jobs().await
    }

    pub fn counters(&self) -> &Counters {
        &self.state.counters
    }
}

#[async_trait]
impl Service for WorkerService {
    fn name(&self) -> &'static str {
        "worker"
    }

    fn register(&self, routes: &mut dyn RouteRegistrar) -> Result<(), RegisterError> {
        routes.mount(BASE_PATH, handlers::router(self.state.clone()))
    }

    async fn start(&self, _ctx: &LifecycleContext) -> Result<(), StartError> {
        let config = &self.state.config;
        info!(
            interval = %config.interval,
            max_jobs = config.max_jobs,
            enabled = *config.enable_processing,
            "starting background worker"
        );

        if !self.state.is_enabled() {
            info!("worker processing disabled by configuration");
            return Ok(());
        }

        let mut slot = self.task.lock().await;
        if slot.is_some() {
            return Err(StartError::AlreadyStarted);
        }
        let launch = self.state.launches.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.running.store(launch, Ordering::SeqCst);
        *slot = Some(WorkerTask::spawn(self.state.clone(), launch));

        info!("background worker started successfully");
        Ok(())
    }

    async fn stop(&self, ctx: &LifecycleContext) -> Result<(), StopError> {
        info!("shutting down background worker");

        let task = self.task.lock().await.take();
        let Some(WorkerTask { token, handle }) = task else {
            info!("background worker was not running");
            return Ok(());
        };

        self.state.running.store(0, Ordering::SeqCst);
        token.cancel();

        let started = Instant::now();
        match ctx.run(handle).await {
            Ok(Ok(())) => {
                info!("background worker stopped gracefully");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "background worker exited abnormally");
                Err(StopError::resource(e))
            }
            Err(e) => {
                warn!(error = %e, "background worker shutdown timed out");
                Err(StopError::Timeout {
                    waited: started.elapsed(),
                })
            }
        }
    }

    async fn health(&self) -> ServiceHealth {
        if !self.state.is_enabled() {
            ServiceHealth::Disabled
        } else if self.state.is_running() {
            ServiceHealth::Healthy
        } else {
            ServiceHealth::unhealthy("worker loop is not running")
        }
    }
}
