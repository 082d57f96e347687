use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use vidbatch::batch::{BatchProcessor, BatchSummary, JobExecutor, JobResult};
use vidbatch::manifest::{Job, JobType, Manifest};

struct NoopExecutor;

#[async_trait]
impl JobExecutor for NoopExecutor {
    async fn execute(&self, _scope: &CancellationToken, job: &Job) -> anyhow::Result<JobResult> {
        Ok(JobResult::succeeded(&job.id, &job.output))
    }
}

fn create_manifest(jobs: usize, concurrency: usize) -> Manifest {
    let jobs = (0..jobs)
        .map(|i| {
            Job::new(format!("job-{}", i), JobType::Generate, format!("{}.mp4", i))
                .with_option("prompt", "bench")
        })
        .collect();
    let mut manifest = Manifest::new(jobs).with_concurrency(concurrency);
    manifest.prepare().unwrap();
    manifest
}

fn benchmark_validation(c: &mut Criterion) {
    let manifest = create_manifest(1_000, 4);
    c.bench_function("validate_1000_jobs", |b| b.iter(|| black_box(&manifest).validate()));
}

fn benchmark_processing(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let processor = BatchProcessor::new(Arc::new(NoopExecutor));
    let mut group = c.benchmark_group("process_manifest");

    for concurrency in [1, 4, 16] {
        let manifest = create_manifest(256, concurrency);
        group.bench_with_input(BenchmarkId::from_parameter(concurrency), &manifest, |b, manifest| {
            b.iter(|| {
                rt.block_on(async {
                    processor
                        .process_manifest(&CancellationToken::new(), manifest)
                        .await
                        .unwrap()
                })
            })
        });
    }
    group.finish();
}

fn benchmark_summary(c: &mut Criterion) {
    let results: Vec<JobResult> = (0..10_000)
        .map(|i| JobResult::succeeded(format!("job-{}", i), "out.mp4"))
        .collect();
    c.bench_function("summarize_10000_results", |b| {
        b.iter(|| BatchSummary::from_results(black_box(&results)))
    });
}

criterion_group!(benches, benchmark_validation, benchmark_processing, benchmark_summary);
criterion_main!(benches);
