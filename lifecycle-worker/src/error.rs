use thiserror::Error;

/// Enumeration of reasons a job submission is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("job queue is full (max: {max_jobs})")]
    Full { max_jobs: usize },
    #[error("job type is required")]
    InvalidJob,
}
