use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QueueError;

/// Enumeration of possible statuses for a Job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// A job waiting for the next processing step.
    Pending,
    /// A job that has been processed.
    Completed,
}

/// A unit of work submitted through the API and completed by the background loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    #[serde(rename = "type")]
    pub job_type: String,
    pub data: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Number of jobs in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

/// An in-memory, bounded job queue. Jobs are never removed, so `max_jobs`
/// bounds the total number ever accepted.
#[derive(Debug)]
pub struct JobQueue {
    jobs: Vec<Job>,
    next_id: u64,
    max_jobs: usize,
}

impl JobQueue {
    pub fn new(max_jobs: usize) -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
            max_jobs,
        }
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Accept a new pending job, unless its type is empty or the queue is at capacity.
    pub fn submit(&mut self, job_type: &str, data: &str) -> Result<Job, QueueError> {
        if job_type.is_empty() {
            return Err(QueueError::InvalidJob);
        }
        if self.jobs.len() >= self.max_jobs {
            return Err(QueueError::Full {
                max_jobs: self.max_jobs,
            });
        }

        let now = Utc::now();
        let job = Job {
            id: self.next_id,
            job_type: job_type.to_owned(),
            data: data.to_owned(),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.next_id += 1;
        self.jobs.push(job.clone());

        Ok(job)
    }

    /// Mark every pending job completed, returning how many changed.
    pub fn complete_pending(&mut self) -> usize {
        let mut completed = 0;
        for job in self.jobs.iter_mut() {
            if job.status != JobStatus::Pending {
                continue;
            }
            job.status = JobStatus::Completed;
            job.updated_at = Utc::now().max(job.created_at);
            completed += 1;
            debug!(job_id = job.id, job_type = %job.job_type, "processed job");
        }
        completed
    }

    pub fn counts(&self) -> JobCounts {
        let pending = self
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Pending)
            .count();
        JobCounts {
            total: self.jobs.len(),
            pending,
            completed: self.jobs.len() - pending,
        }
    }
}
