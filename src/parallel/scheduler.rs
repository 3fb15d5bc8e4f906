//! Bounded-concurrency job scheduling
//!
//! Two strategies share one ceiling, `max_concurrent` jobs in flight:
//!
//! - [`SchedulingStrategy::Chunked`] launches consecutive chunks of at most
//!   `max_concurrent` jobs and waits for the whole chunk before starting the
//!   next. A slow job holds back the following chunk.
//! - [`SchedulingStrategy::Pool`] runs `max_concurrent` workers that pull jobs
//!   from a bounded channel, so a free worker picks up the next job at once.
//!
//! Jobs never cancel each other. A failing or panicking job is recorded and
//! the batch carries on. There is no timeout: a stuck codec call holds its
//! slot until it returns.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel;
use futures::future::join_all;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::{Config, SchedulingStrategy};
use crate::error::{Result, GlobResizeError};
use crate::parallel::{BatchReport, JobReport, ProgressTracker};
use crate::processing::{ImagePipeline, Job, JobOutcome};

/// Runs a batch of jobs through an [`ImagePipeline`] under a concurrency ceiling
pub struct BatchScheduler {
    max_concurrent: usize,
    strategy: SchedulingStrategy,
    progress: Arc<ProgressTracker>,
}

impl BatchScheduler {
    /// Create a scheduler; a ceiling of 0 is treated as 1
    pub fn new(max_concurrent: usize, strategy: SchedulingStrategy) -> Self {
        let max_concurrent = max_concurrent.max(1);
        info!("Initializing {:?} scheduler with {} concurrent workers", strategy, max_concurrent);

        Self {
            max_concurrent,
            strategy,
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.concurrency, config.strategy)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Run every job and wait for all of them.
    ///
    /// Returns [`GlobResizeError::EmptyBatch`] without launching anything
    /// when `jobs` is empty. Per-job failures end up in the report.
    pub async fn run(&self, jobs: Vec<Job>, pipeline: Arc<ImagePipeline>) -> Result<BatchReport> {
        if jobs.is_empty() {
            error!("No jobs to schedule");
            return Err(GlobResizeError::EmptyBatch);
        }

        let start_time = Instant::now();
        self.progress.start(jobs.len());

        let reports = match self.strategy {
            SchedulingStrategy::Chunked => self.run_chunked(jobs, pipeline).await,
            SchedulingStrategy::Pool => self.run_pool(jobs, pipeline).await,
        };

        let report = BatchReport::from_reports(&reports, start_time.elapsed());
        info!("Batch completed in {:.2}s: {}",
              report.elapsed_secs, self.progress.get_state().status_text());
        Ok(report)
    }

    async fn run_chunked(&self, jobs: Vec<Job>, pipeline: Arc<ImagePipeline>) -> Vec<JobReport> {
        let total = jobs.len();
        let chunk_count = total.div_ceil(self.max_concurrent);
        let mut reports = Vec::with_capacity(total);

        for (chunk_idx, chunk) in jobs.chunks(self.max_concurrent).enumerate() {
            debug!("Processing chunk {} of {} ({} files)", chunk_idx + 1, chunk_count, chunk.len());

            let offset = chunk_idx * self.max_concurrent;
            let tasks: Vec<JoinHandle<Result<JobOutcome>>> = chunk
                .iter()
                .enumerate()
                .map(|(i, job)| {
                    log_dispatch(offset + i, total, job);
                    let job = job.clone();
                    let pipeline = Arc::clone(&pipeline);
                    let progress = Arc::clone(&self.progress);
                    tokio::task::spawn_blocking(move || run_job(&pipeline, &progress, &job))
                })
                .collect();

            // Barrier: the next chunk waits for every task in this one
            let results = join_all(tasks).await;

            for (job, joined) in chunk.iter().zip(results) {
                reports.push(JobReport {
                    job: job.clone(),
                    result: self.flatten_join(job, joined),
                });
            }
        }

        reports
    }

    async fn run_pool(&self, jobs: Vec<Job>, pipeline: Arc<ImagePipeline>) -> Vec<JobReport> {
        let total = jobs.len();
        let workers = self.max_concurrent.min(total);
        let planned = jobs.clone();
        let (sender, receiver) = channel::bounded::<(usize, Job)>(workers);

        let handles: Vec<JoinHandle<Vec<(usize, JobReport)>>> = (0..workers)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let pipeline = Arc::clone(&pipeline);
                let progress = Arc::clone(&self.progress);
                tokio::task::spawn_blocking(move || {
                    let mut done = Vec::new();
                    for (index, job) in receiver.iter() {
                        log_dispatch(index, total, &job);
                        let result = run_job(&pipeline, &progress, &job);
                        done.push((index, JobReport { job, result }));
                    }
                    debug!("Worker {} drained the queue after {} jobs", worker_id, done.len());
                    done
                })
            })
            .collect();
        drop(receiver);

        // Feeding blocks whenever the queue is full, so it gets its own thread
        let feeder = tokio::task::spawn_blocking(move || {
            for entry in jobs.into_iter().enumerate() {
                if let Err(channel::SendError((index, job))) = sender.send(entry) {
                    warn!("No worker left to take job {} ({:?})", index + 1, job.source);
                    break;
                }
            }
        });
        if let Err(e) = feeder.await {
            error!("Job feeder failed: {}", e);
        }

        let mut indexed: Vec<(usize, JobReport)> = Vec::with_capacity(total);
        for joined in join_all(handles).await {
            match joined {
                Ok(done) => indexed.extend(done),
                Err(e) => error!("Worker task failed: {}", e),
            }
        }

        restore_order(indexed, &planned)
    }

    fn flatten_join(
        &self,
        job: &Job,
        joined: std::result::Result<Result<JobOutcome>, JoinError>,
    ) -> Result<JobOutcome> {
        joined.unwrap_or_else(|e| {
            // run_job never got to signal
            self.progress.fail_undispatched();
            let err = GlobResizeError::task(&job.source, e.to_string());
            warn!("[{}] {}", err.stage(), err);
            Err(err)
        })
    }
}

/// Put pool reports back in enumeration order.
///
/// Jobs whose report went down with a failed worker are reported as
/// `Task` errors so the batch still accounts for every job.
fn restore_order(mut indexed: Vec<(usize, JobReport)>, planned: &[Job]) -> Vec<JobReport> {
    indexed.sort_by_key(|(index, _)| *index);

    let mut collected = indexed.into_iter().peekable();
    let mut reports = Vec::with_capacity(planned.len());
    for (index, job) in planned.iter().enumerate() {
        match collected.next_if(|(i, _)| *i == index) {
            Some((_, report)) => reports.push(report),
            None => {
                let err = GlobResizeError::task(&job.source, "worker exited before reporting");
                warn!("[{}][Error] {}", err.stage(), err);
                reports.push(JobReport { job: job.clone(), result: Err(err) });
            }
        }
    }
    reports
}

fn log_dispatch(index: usize, total: usize, job: &Job) {
    info!("({}/{}) {} -> {}",
          index + 1, total, job.source.display(), job.destination.display());
}

/// Process one job, signal completion and log any failure
fn run_job(pipeline: &ImagePipeline, progress: &ProgressTracker, job: &Job) -> Result<JobOutcome> {
    progress.dispatch();

    let result = catch_unwind(AssertUnwindSafe(|| pipeline.process(job)))
        .unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "pipeline panicked".to_string());
            Err(GlobResizeError::task(&job.source, message))
        });

    progress.complete(result.is_ok());
    match &result {
        Err(e) if e.is_recoverable() => warn!("[{}][Error] {}", e.stage(), e),
        Err(e) => error!("[{}][Error] {}", e.stage(), e),
        Ok(_) => {}
    }
    result
}
