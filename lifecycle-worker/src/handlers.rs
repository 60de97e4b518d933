use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lifecycle_common::ApiError;
use serde_derive::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::queue::Job;
use crate::service::WorkerState;

pub fn router(state: Arc<WorkerState>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/jobs", get(get_jobs).post(create_job))
        .route("/health", get(health_check))
        .with_state(state)
}

impl From<QueueError> for ApiError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Full { .. } => {
                ApiError::new(StatusCode::TOO_MANY_REQUESTS, error.to_string())
            }
            QueueError::InvalidJob => ApiError::bad_request(error.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StatusResponse {
    pub status: WorkerStatus,
    pub metrics: WorkerMetrics,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WorkerStatus {
    pub running: bool,
    pub enabled: bool,
    pub interval: String,
    pub max_jobs: usize,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WorkerMetrics {
    pub total_jobs: usize,
    pub pending_jobs: usize,
    pub completed_jobs: usize,
    pub processed: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JobsResponse {
    pub jobs: Vec<Job>,
    pub count: usize,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct CreateJobRequest {
    #[serde(rename = "type", default)]
    pub job_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateJobResponse {
    pub job: Job,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub running: bool,
    pub enabled: bool,
    pub timestamp: DateTime<Utc>,
}

async fn get_status(State(state): State<Arc<WorkerState>>) -> Json<StatusResponse> {
    let (counts, processed) = state.stats().await;

    Json(StatusResponse {
        status: WorkerStatus {
            running: state.is_running(),
            enabled: state.is_enabled(),
            interval: state.config.interval.to_string(),
            max_jobs: state.config.max_jobs,
        },
        metrics: WorkerMetrics {
            total_jobs: counts.total,
            pending_jobs: counts.pending,
            completed_jobs: counts.completed,
            processed,
        },
    })
}

async fn get_jobs(State(state): State<Arc<WorkerState>>) -> Json<JobsResponse> {
    let jobs = state.jobs().await;

    Json(JobsResponse {
        count: jobs.len(),
        jobs,
    })
}

async fn create_job(
    State(state): State<Arc<WorkerState>>,
    Json(payload): Json<CreateJobRequest>,
) -> Result<Json<CreateJobResponse>, ApiError> {
    let job = state.submit(&payload.job_type, &payload.data).await?;

    Ok(Json(CreateJobResponse {
        job,
        message: "Job created successfully".to_owned(),
    }))
}

async fn health_check(State(state): State<Arc<WorkerState>>) -> (StatusCode, Json<HealthResponse>) {
    let running = state.is_running();
    let enabled = state.is_enabled();

    // A disabled worker is not expected to run.
    let (code, status) = if enabled && !running {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_owned(),
            running,
            enabled,
            timestamp: Utc::now(),
        }),
    )
}
