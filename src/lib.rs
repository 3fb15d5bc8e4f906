//! GlobResize - Bounded-Concurrency Batch Image Resizer
//!
//! Shrinks every JPEG or PNG matched by a glob pattern so its longest side
//! fits a configured limit, writing `<prefix><name>` next to each source.
//! Images that already fit are copied unchanged.
//!
//! # Architecture
//!
//! - [`processing::decide`]: pure longest-side policy
//! - [`processing::ImagePipeline`]: read, sniff, decode, then resize or copy one file
//! - [`parallel::BatchScheduler`]: runs jobs with at most `concurrency` in flight
//! - [`discovery`]: expands the glob into jobs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use globresize::Config;
//!
//! # async fn example() -> globresize::Result<()> {
//! let config = Config {
//!     pattern: "photos/*.jpg".to_string(),
//!     longest_side: 1920,
//!     ..Config::default()
//! };
//! config.validate()?;
//!
//! let report = globresize::run(Arc::new(config)).await?;
//! report.print_summary();
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

pub mod config;
pub mod discovery;
pub mod error;
pub mod parallel;
pub mod processing;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, ConfigOverrides, LoggingConfig, ResampleFilter, SchedulingStrategy};
pub use error::{Result, GlobResizeError};
pub use parallel::{BatchReport, BatchScheduler};
pub use processing::{decide, ImagePipeline, Job, JobOutcome, ResizeDecision};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Side length of the source image assumed when estimating memory per slot
const REFERENCE_SOURCE_SIDE: u32 = 8000;

/// Install the global tracing subscriber.
///
/// Logs go to stderr. `RUST_LOG` wins over the configured level when set.
/// Calling this again once a subscriber is installed does nothing.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let installed = if logging.json_format {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish(),
        )
    };

    if installed.is_ok() {
        info!("GlobResize v{} initialized", VERSION);
    }
}

/// Log CPU and memory headroom for the configured concurrency
pub fn check_system(config: &Config) {
    use sysinfo::{System, SystemExt};

    let cpu_count = num_cpus::get();
    info!("Detected {} logical CPUs", cpu_count);
    if config.concurrency > cpu_count {
        warn!(
            "Concurrency {} exceeds {} logical CPUs; jobs will time-share cores",
            config.concurrency, cpu_count
        );
    }

    let mut system = System::new();
    system.refresh_memory();
    let available_memory = system.available_memory();

    let per_slot = processing::estimate_slot_bytes(REFERENCE_SOURCE_SIDE, config.longest_side);
    let estimate = per_slot.saturating_mul(config.concurrency as u64);
    if available_memory > 0 && estimate > available_memory {
        warn!(
            "Low available memory: {}MB for {} slots of up to ~{}MB each; consider lowering concurrency",
            available_memory / (1024 * 1024),
            config.concurrency,
            per_slot / (1024 * 1024)
        );
    }
}

/// Expand the configured pattern and run the whole batch
pub async fn run(config: Arc<Config>) -> Result<BatchReport> {
    let jobs = discovery::plan_jobs(&config)?;
    let pipeline = Arc::new(ImagePipeline::new(Arc::clone(&config)));
    BatchScheduler::from_config(&config).run(jobs, pipeline).await
}
