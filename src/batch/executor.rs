//! The job execution seam.
//!
//! The processor never talks to a video backend itself; callers inject an
//! implementation of [`JobExecutor`] that performs one job.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::types::JobResult;
use crate::manifest::Job;

/// Performs a single job.
///
/// Implementations are shared by every worker of a batch and must tolerate
/// concurrent calls with different jobs.
///
/// - `Err(_)` with `continue_on_error` on becomes a failed [`JobResult`].
/// - `Err(_)` with `continue_on_error` off aborts the batch.
/// - `Ok(result)` supplies success and output. Timing fields are overwritten
///   by the processor, which measures the call itself.
///
/// `scope` is cancelled when the batch is aborted or the caller cancels it.
/// The processor does not interrupt a running call; long-running executors
/// should watch the token.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Execute one job
    async fn execute(&self, scope: &CancellationToken, job: &Job) -> anyhow::Result<JobResult>;
}

