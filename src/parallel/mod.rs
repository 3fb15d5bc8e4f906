//! Parallel batch execution and its results

use std::path::PathBuf;
use std::time::Duration;

use console::style;
use serde::Serialize;

use crate::error::Result;
use crate::processing::{Job, JobOutcome};

pub mod progress;
pub mod scheduler;

pub use progress::*;
pub use scheduler::*;

/// Result of running one job
#[derive(Debug)]
pub struct JobReport {
    pub job: Job,
    pub result: Result<JobOutcome>,
}

/// Serializable per-job line of a [`BatchReport`]
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&JobReport> for JobRecord {
    fn from(report: &JobReport) -> Self {
        let (outcome, error) = match &report.result {
            Ok(outcome) => (Some(outcome.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            source: report.job.source.clone(),
            destination: report.job.destination.clone(),
            outcome,
            error,
        }
    }
}

/// Result of batch processing operation
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub resized: usize,
    pub copied: usize,
    pub failed: usize,
    pub bytes_written: u64,
    pub elapsed_secs: f64,
    /// One record per job, in enumeration order
    pub jobs: Vec<JobRecord>,
}

impl BatchReport {
    /// Aggregate per-job reports
    pub fn from_reports(reports: &[JobReport], elapsed: Duration) -> Self {
        let mut report = Self {
            total: reports.len(),
            resized: 0,
            copied: 0,
            failed: 0,
            bytes_written: 0,
            elapsed_secs: elapsed.as_secs_f64(),
            jobs: Vec::with_capacity(reports.len()),
        };

        for job_report in reports {
            match &job_report.result {
                Ok(outcome @ JobOutcome::Resized { .. }) => {
                    report.resized += 1;
                    report.bytes_written += outcome.bytes_written();
                }
                Ok(outcome @ JobOutcome::Copied { .. }) => {
                    report.copied += 1;
                    report.bytes_written += outcome.bytes_written();
                }
                Err(_) => report.failed += 1,
            }
            report.jobs.push(JobRecord::from(job_report));
        }

        report
    }

    pub fn succeeded(&self) -> usize {
        self.resized + self.copied
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobRecord> {
        self.jobs.iter().filter(|record| record.error.is_some())
    }

    pub fn files_per_second(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.succeeded() as f64 / self.elapsed_secs
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!();
        println!("{}", style("Processing Summary:").bold());
        println!("  {}: {}", style("Resized").green(), self.resized);
        println!("  {}: {}", style("Copied").green(), self.copied);
        if self.failed > 0 {
            println!("  {}: {}", style("Failed").red(), self.failed);
        }
        println!("  {}: {:.2}s", style("Duration").blue(), self.elapsed_secs);

        if self.succeeded() > 0 {
            println!("  {}: {:.2}MB written", style("Size").cyan(),
                     self.bytes_written as f64 / 1024.0 / 1024.0);
            println!("  {}: {:.1} files/sec", style("Speed").cyan(), self.files_per_second());
        }

        if self.has_failures() {
            println!();
            println!("{}", style("Errors:").red().bold());
            for (i, record) in self.failures().enumerate() {
                println!("  {}: {}", i + 1, record.error.as_deref().unwrap_or_default());
            }
        }
    }
}
