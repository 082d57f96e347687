//! # Video Batch
//!
//! Concurrent batch execution engine for long-running remote video generation jobs.
//!
//! ## Overview
//!
//! A batch is described by a [`manifest::Manifest`]: an ordered list of jobs plus
//! batch settings (concurrency, failure policy, output directory). The
//! [`batch::BatchProcessor`] fans the jobs out to a bounded pool of workers, each
//! calling an injected [`batch::JobExecutor`], and collects one
//! [`batch::JobResult`] per attempted job.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use vidbatch::batch::{BatchProcessor, BatchSummary, JobExecutor, JobResult};
//! use vidbatch::manifest::{Job, Manifest};
//!
//! struct Renderer;
//!
//! #[async_trait]
//! impl JobExecutor for Renderer {
//!     async fn execute(
//!         &self,
//!         _scope: &CancellationToken,
//!         job: &Job,
//!     ) -> anyhow::Result<JobResult> {
//!         Ok(JobResult::succeeded(&job.id, &job.output))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::load("batch.yaml")?;
//! let processor = BatchProcessor::new(Arc::new(Renderer));
//!
//! let results = processor
//!     .process_manifest(&CancellationToken::new(), &manifest)
//!     .await?;
//! println!("{}", BatchSummary::from_results(&results));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`manifest`]: manifest model, loading, defaults and validation
//! - [`batch`]: worker-pool processor, executor seam, results and summaries
//! - [`operations`]: registry of in-flight job operations

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use thiserror::Error;

/// Result type for batch operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Main error type for batch operations
#[derive(Error, Debug)]
pub enum BatchError {
    /// Manifest could not be read or parsed
    #[error("Manifest error: {0}")]
    Manifest(#[from] manifest::ManifestError),

    /// Manifest is structurally or semantically invalid
    #[error("Validation error: {0}")]
    Validation(#[from] manifest::ValidationError),

    /// Batch aborted by a job failure or by cancellation
    #[error("Processing error: {0}")]
    Process(#[from] batch::ProcessError),
}

/// Manifest model, loading and validation
pub mod manifest;

/// Batch processing engine
pub mod batch;

/// Tracking of in-flight job operations
pub mod operations;
