//! Per-job results and batch-level failures

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of one attempted job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// ID of the job this result belongs to
    pub job_id: String,
    /// Whether the job produced its output
    pub success: bool,
    /// Output path, present iff `success`
    pub output: Option<String>,
    /// Human-readable failure, present iff not `success`
    pub error: Option<String>,
    /// Wall-clock time spent in the executor
    pub duration: Duration,
    /// When the executor call started
    pub start_time: DateTime<Utc>,
    /// When the executor call returned
    pub end_time: DateTime<Utc>,
}

impl JobResult {
    /// Successful result with placeholder timing
    pub fn succeeded(job_id: impl Into<String>, output: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            duration: Duration::ZERO,
            start_time: now,
            end_time: now,
        }
    }

    /// Failed result with placeholder timing
    pub fn failed(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            success: false,
            output: None,
            error: Some(error.into()),
            duration: Duration::ZERO,
            start_time: now,
            end_time: now,
        }
    }

    /// Replace the timing fields
    pub fn with_timing(
        mut self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self.duration = duration;
        self
    }
}

/// Why a batch stopped before every job produced a result.
///
/// Both variants carry the results collected so far, in completion order.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// A job failed while `continue_on_error` was off
    #[error("job '{job_id}' failed: {message}")]
    JobFailed {
        /// The first job that failed
        job_id: String,
        /// Executor error message
        message: String,
        /// Results collected before the batch stopped
        partial: Vec<JobResult>,
    },

    /// The caller's cancellation token fired
    #[error("batch cancelled with {} results collected", .partial.len())]
    Cancelled {
        /// Results collected before cancellation
        partial: Vec<JobResult>,
    },
}

impl ProcessError {
    /// Results collected before the batch stopped
    pub fn partial_results(&self) -> &[JobResult] {
        match self {
            ProcessError::JobFailed { partial, .. } => partial,
            ProcessError::Cancelled { partial } => partial,
        }
    }

    /// Take ownership of the partial results
    pub fn into_partial_results(self) -> Vec<JobResult> {
        match self {
            ProcessError::JobFailed { partial, .. } => partial,
            ProcessError::Cancelled { partial } => partial,
        }
    }

    /// Whether the batch was stopped by the caller rather than by a job
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessError::Cancelled { .. })
    }
}
