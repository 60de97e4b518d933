//! A task-loop-backed service: an in-memory job queue with admission control,
//! a background loop completing pending jobs once per interval, and the HTTP
//! surface for submitting and inspecting jobs.

pub mod config;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod service;
mod worker;

pub use config::WorkerConfig;
pub use error::QueueError;
pub use queue::{Job, JobCounts, JobQueue, JobStatus};
pub use service::WorkerService;
