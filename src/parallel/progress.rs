//! Progress tracking for parallel operations

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Thread-safe completion counter signalled by many workers, read by one waiter
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: AtomicUsize,
    dispatched: AtomicUsize,
    running: AtomicUsize,
    peak_running: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    start_time: Mutex<Option<Instant>>,
}

/// Point-in-time view of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    pub total: usize,
    pub dispatched: usize,
    pub running: usize,
    pub peak_running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset counters for a batch of `total` jobs
    pub fn start(&self, total: usize) {
        if let Ok(mut start_time) = self.start_time.lock() {
            *start_time = Some(Instant::now());
        }

        self.total.store(total, Ordering::SeqCst);
        self.dispatched.store(0, Ordering::SeqCst);
        self.running.store(0, Ordering::SeqCst);
        self.peak_running.store(0, Ordering::SeqCst);
        self.succeeded.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);

        debug!("Started progress tracking for {} jobs", total);
    }

    /// Record that a job has been handed to a worker; returns its 1-based sequence number
    pub fn dispatch(&self) -> usize {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(now, Ordering::SeqCst);
        self.dispatched.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record that a job has finished
    pub fn complete(&self, success: bool) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        if success {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Record a failure for a job whose worker never got to dispatch it
    pub fn fail_undispatched(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn finished(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        self.finished() >= self.total.load(Ordering::SeqCst)
    }

    pub fn get_state(&self) -> ProgressState {
        let elapsed = self.start_time
            .lock()
            .ok()
            .and_then(|start| start.map(|s| s.elapsed()))
            .unwrap_or_default();

        ProgressState {
            total: self.total.load(Ordering::SeqCst),
            dispatched: self.dispatched.load(Ordering::SeqCst),
            running: self.running.load(Ordering::SeqCst),
            peak_running: self.peak_running.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            elapsed,
        }
    }
}

impl ProgressState {
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.succeeded + self.failed) as f64 / self.total as f64 * 100.0
    }

    pub fn status_text(&self) -> String {
        format!(
            "{}/{} done ({} failed, {} running)",
            self.succeeded + self.failed,
            self.total,
            self.failed,
            self.running
        )
    }
}
