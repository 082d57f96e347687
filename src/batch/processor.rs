//! Batch Processor
//!
//! Worker-pool execution of a manifest:
//! - a fixed pool of `concurrency` tokio tasks pulling from a FIFO work queue
//! - per-job wall-clock timing measured around the executor call
//! - continue-on-error or abort-on-first-error failure policy
//! - cooperative cancellation through a child [`CancellationToken`]
//! - fan-in collection of results in completion order

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::executor::JobExecutor;
use super::summary::BatchSummary;
use super::types::{JobResult, ProcessError};
use crate::manifest::{Job, Manifest, DEFAULT_CONCURRENCY};
use crate::operations::{Operation, OperationRegistry};

/// First fatal job error reported by a worker in abort mode
#[derive(Debug)]
struct JobFailure {
    job_id: String,
    message: String,
}

/// Runs the jobs of a manifest against an injected executor
pub struct BatchProcessor {
    /// Performs individual jobs
    executor: Arc<dyn JobExecutor>,
    /// Worker count for manifests that leave concurrency unset
    default_concurrency: usize,
    /// Optional tracking of per-job operations
    registry: Option<Arc<OperationRegistry>>,
}

impl BatchProcessor {
    /// Create a processor with the default concurrency
    pub fn new(executor: Arc<dyn JobExecutor>) -> Self {
        Self {
            executor,
            default_concurrency: DEFAULT_CONCURRENCY,
            registry: None,
        }
    }

    /// Worker count used when the manifest does not set one
    pub fn with_default_concurrency(mut self, concurrency: usize) -> Self {
        self.default_concurrency = concurrency.max(1);
        self
    }

    /// Record every job as an operation in `registry`.
    ///
    /// Entries are added when a worker picks a job up and are never removed
    /// by the processor; call [`OperationRegistry::prune_finished`] between
    /// batches. A job abandoned by caller cancellation stays `Running` until
    /// its executor call returns.
    pub fn with_registry(mut self, registry: Arc<OperationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Worker count used when the manifest does not set one
    pub fn default_concurrency(&self) -> usize {
        self.default_concurrency
    }

    /// Worker count applied to `manifest`
    pub fn effective_concurrency(&self, manifest: &Manifest) -> usize {
        manifest.concurrency.unwrap_or(self.default_concurrency).max(1)
    }

    /// Run every job of a validated manifest.
    ///
    /// Results are returned in completion order; correlate them by `job_id`.
    /// On error the collected results are carried by the [`ProcessError`]:
    /// [`ProcessError::JobFailed`] when a job fails with `continue_on_error`
    /// off, [`ProcessError::Cancelled`] when `parent` is cancelled first.
    /// Cancellation returns immediately without waiting for executor calls
    /// already in flight.
    #[instrument(skip(self, parent, manifest), fields(job_count = manifest.jobs.len()))]
    pub async fn process_manifest(
        &self,
        parent: &CancellationToken,
        manifest: &Manifest,
    ) -> Result<Vec<JobResult>, ProcessError> {
        let batch_start = Instant::now();
        let total_jobs = manifest.jobs.len();

        if total_jobs == 0 {
            info!("No jobs to execute in batch");
            return Ok(Vec::new());
        }

        let concurrency = self.effective_concurrency(manifest);
        let continue_on_error = manifest.continue_on_error();
        info!(
            total_jobs = total_jobs,
            concurrency = concurrency,
            continue_on_error = continue_on_error,
            "Starting batch execution"
        );

        let scope = parent.child_token();

        // The whole job set is known upfront, so the queue is filled and
        // closed before any worker starts.
        let (job_tx, job_rx) = mpsc::channel(total_jobs);
        for job in &manifest.jobs {
            if job_tx.send(job.clone()).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let queue = Arc::new(Mutex::new(job_rx));

        let (result_tx, mut result_rx) = mpsc::channel(total_jobs);
        let (fatal_tx, mut fatal_rx) = mpsc::channel(1);

        let workers: Vec<JoinHandle<()>> = (0..concurrency)
            .map(|index| {
                let worker = Worker {
                    index,
                    executor: Arc::clone(&self.executor),
                    queue: Arc::clone(&queue),
                    results: result_tx.clone(),
                    fatal: fatal_tx.clone(),
                    scope: scope.clone(),
                    continue_on_error,
                    registry: self.registry.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        drop(result_tx);
        drop(fatal_tx);

        let mut results = Vec::with_capacity(total_jobs);
        let mut fatal: Option<JobFailure> = None;

        loop {
            tokio::select! {
                biased;
                _ = parent.cancelled() => {
                    scope.cancel();
                    warn!(
                        collected = results.len(),
                        total_jobs = total_jobs,
                        "Batch cancelled by caller"
                    );
                    return Err(ProcessError::Cancelled { partial: results });
                }
                Some(failure) = fatal_rx.recv(), if fatal.is_none() => {
                    error!(
                        job_id = %failure.job_id,
                        error = %failure.message,
                        "Job failed, aborting batch"
                    );
                    scope.cancel();
                    fatal = Some(failure);
                }
                next = result_rx.recv() => match next {
                    Some(result) => results.push(result),
                    None => break,
                },
            }
        }

        // A failure published just before the last worker exited.
        if fatal.is_none() {
            fatal = fatal_rx.try_recv().ok();
        }

        for handle in workers {
            if let Err(e) = handle.await {
                error!("Worker join error: {}", e);
            }
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            total_jobs = total_jobs,
            collected = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            success_rate = format!("{:.2}%", summary.success_rate()),
            batch_duration_ms = batch_start.elapsed().as_millis(),
            "Batch execution finished"
        );

        match fatal {
            Some(JobFailure { job_id, message }) if !continue_on_error => {
                Err(ProcessError::JobFailed {
                    job_id,
                    message,
                    partial: results,
                })
            }
            _ => Ok(results),
        }
    }
}

/// One member of the worker pool
struct Worker {
    index: usize,
    executor: Arc<dyn JobExecutor>,
    queue: Arc<Mutex<mpsc::Receiver<Job>>>,
    results: mpsc::Sender<JobResult>,
    fatal: mpsc::Sender<JobFailure>,
    scope: CancellationToken,
    continue_on_error: bool,
    registry: Option<Arc<OperationRegistry>>,
}

impl Worker {
    async fn run(self) {
        debug!(worker = self.index, "Worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = self.scope.cancelled() => break,
                next = Self::next_job(&self.queue) => match next {
                    Some(job) => job,
                    None => break,
                },
            };

            let operation_id = self.track_start(&job);
            debug!(worker = self.index, job_id = %job.id, "Executing job");

            let start_time = Utc::now();
            let started = Instant::now();
            let outcome = AssertUnwindSafe(self.executor.execute(&self.scope, &job))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(anyhow!("executor panicked: {}", panic_message(&*panic)))
                });
            let duration = started.elapsed();
            let end_time = Utc::now();

            let result = match outcome {
                Ok(result) => JobResult {
                    job_id: job.id.clone(),
                    ..result
                }
                .with_timing(start_time, end_time, duration),
                Err(e) if self.continue_on_error => {
                    let message = format!("{:#}", e);
                    warn!(
                        job_id = %job.id,
                        duration_ms = duration.as_millis(),
                        error = %message,
                        "Job failed"
                    );
                    JobResult::failed(job.id.clone(), message)
                        .with_timing(start_time, end_time, duration)
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    self.track_finish(operation_id.as_deref(), Err(message.as_str()));
                    if self.fatal.try_send(JobFailure { job_id: job.id, message }).is_err() {
                        debug!(worker = self.index, "Another job failure was reported first");
                    }
                    // Publish before cancelling so the first failure owns the slot.
                    self.scope.cancel();
                    break;
                }
            };

            if result.success {
                info!(
                    job_id = %result.job_id,
                    duration_ms = duration.as_millis(),
                    "Job completed successfully"
                );
                self.track_finish(operation_id.as_deref(), Ok(result.output.clone()));
            } else {
                let message = result.error.clone().unwrap_or_default();
                self.track_finish(operation_id.as_deref(), Err(message.as_str()));
            }

            if self.results.send(result).await.is_err() {
                // Collector is gone: the caller cancelled the batch.
                break;
            }
        }

        debug!(worker = self.index, "Worker stopped");
    }

    async fn next_job(queue: &Mutex<mpsc::Receiver<Job>>) -> Option<Job> {
        queue.lock().await.recv().await
    }

    fn track_start(&self, job: &Job) -> Option<String> {
        let registry = self.registry.as_ref()?;
        let mut operation = Operation::for_job(job);
        operation.start();
        let id = operation.id.clone();
        match registry.add(operation) {
            Ok(()) => Some(id),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Failed to register operation");
                None
            }
        }
    }

    fn track_finish(&self, operation_id: Option<&str>, outcome: Result<Option<String>, &str>) {
        let (Some(registry), Some(id)) = (self.registry.as_ref(), operation_id) else {
            return;
        };
        let updated = registry.update(id, |operation| match outcome {
            Ok(output) => operation.succeed(output),
            Err(message) => operation.fail(message),
        });
        if let Err(e) = updated {
            warn!(operation_id = %id, error = %e, "Failed to update operation");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("executor", &"JobExecutor")
            .field("default_concurrency", &self.default_concurrency)
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::JobType;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl JobExecutor for Echo {
        async fn execute(
            &self,
            _scope: &CancellationToken,
            job: &Job,
        ) -> anyhow::Result<JobResult> {
            Ok(JobResult::succeeded(&job.id, &job.output))
        }
    }

    fn manifest(count: usize) -> Manifest {
        Manifest::new(
            (0..count)
                .map(|i| {
                    Job::new(format!("job-{}", i), JobType::Generate, format!("{}.mp4", i))
                        .with_option("prompt", "x")
                })
                .collect(),
        )
    }

    #[test]
    fn test_processor_configuration() {
        let processor = BatchProcessor::new(Arc::new(Echo));
        assert_eq!(processor.default_concurrency(), DEFAULT_CONCURRENCY);

        let processor = processor.with_default_concurrency(0);
        assert_eq!(processor.default_concurrency(), 1);
    }

    #[test]
    fn test_manifest_concurrency_is_authoritative() {
        let processor = BatchProcessor::new(Arc::new(Echo)).with_default_concurrency(8);
        assert_eq!(processor.effective_concurrency(&manifest(1)), 8);
        assert_eq!(processor.effective_concurrency(&manifest(1).with_concurrency(2)), 2);
    }

    #[tokio::test]
    async fn test_empty_manifest_returns_no_results() {
        let processor = BatchProcessor::new(Arc::new(Echo));
        let results = processor
            .process_manifest(&CancellationToken::new(), &Manifest::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_more_workers_than_jobs() {
        let processor = BatchProcessor::new(Arc::new(Echo));
        let results = processor
            .process_manifest(&CancellationToken::new(), &manifest(2).with_concurrency(16))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_registry_tracks_every_job() {
        let registry = Arc::new(OperationRegistry::new());
        let processor = BatchProcessor::new(Arc::new(Echo)).with_registry(registry.clone());
        processor
            .process_manifest(&CancellationToken::new(), &manifest(4))
            .await
            .unwrap();

        let stats = registry.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 4);
    }
}
