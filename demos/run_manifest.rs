//! Run a manifest against a simulated video backend.
//!
//! ```text
//! cargo run --example run_manifest -- path/to/batch.yaml
//! ```
//!
//! Without an argument a built-in sample batch is used. Jobs honour two
//! demo-only options: `simulate_ms` (render time) and `simulate_failure`.
//! Ctrl-C cancels the batch and prints the partial results.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vidbatch::batch::{BatchProcessor, BatchSummary, JobExecutor, JobResult, ProcessError};
use vidbatch::manifest::{Job, Manifest};
use vidbatch::operations::OperationRegistry;

const SAMPLE: &str = r#"
concurrency: 2
output_directory: out
jobs:
  - id: opening
    type: generate
    options: {prompt: "a lighthouse at dusk", simulate_ms: 300}
    output: opening.mp4
  - id: hero
    type: animate
    options: {image: hero.png, prompt: "hero looks up", simulate_ms: 500}
    output: hero.mp4
  - id: transition
    type: interpolate
    options: {first_frame: a.png, last_frame: b.png, simulate_failure: true}
    output: transition.mp4
  - id: ending
    type: extend
    options: {video: opening.mp4, simulate_ms: 200}
    output: ending.mp4
"#;

/// Pretends to render by sleeping
struct SimulatedBackend {
    manifest: Arc<Manifest>,
}

#[async_trait]
impl JobExecutor for SimulatedBackend {
    async fn execute(&self, scope: &CancellationToken, job: &Job) -> anyhow::Result<JobResult> {
        let render_time = job
            .options
            .get("simulate_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(100);

        tokio::select! {
            _ = scope.cancelled() => bail!("render of '{}' cancelled", job.id),
            _ = tokio::time::sleep(Duration::from_millis(render_time)) => {}
        }

        if job.options.get("simulate_failure").and_then(|v| v.as_bool()) == Some(true) {
            bail!("backend rejected {} request", job.kind);
        }

        let output = self.manifest.output_path_for(job);
        Ok(JobResult::succeeded(&job.id, output.display().to_string()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let manifest = match std::env::args().nth(1) {
        Some(path) => Manifest::load(&path).with_context(|| format!("loading {}", path))?,
        None => {
            let mut manifest = Manifest::from_yaml_str(SAMPLE)?;
            manifest.prepare()?;
            manifest
        }
    };
    let manifest = Arc::new(manifest);

    let registry = Arc::new(OperationRegistry::new());
    let processor = BatchProcessor::new(Arc::new(SimulatedBackend {
        manifest: Arc::clone(&manifest),
    }))
    .with_registry(Arc::clone(&registry));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let results = match processor.process_manifest(&cancel, &manifest).await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("batch stopped: {}", e);
            if let ProcessError::JobFailed { job_id, .. } = &e {
                eprintln!("first failing job: {}", job_id);
            }
            e.into_partial_results()
        }
    };

    for result in &results {
        let secs = result.duration.as_secs_f64();
        match (&result.output, &result.error) {
            (Some(output), _) => {
                println!("  ok    {:<12} {:>6.2}s  {}", result.job_id, secs, output)
            }
            (_, Some(error)) => {
                println!("  fail  {:<12} {:>6.2}s  {}", result.job_id, secs, error)
            }
            _ => println!("  ?     {}", result.job_id),
        }
    }
    println!("{}", BatchSummary::from_results(&results));

    let stats = registry.stats();
    println!(
        "operations: {} tracked, {} succeeded, {} failed",
        stats.total, stats.succeeded, stats.failed
    );

    Ok(())
}
