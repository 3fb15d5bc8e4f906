//! Glob expansion into an ordered job list

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, GlobResizeError};
use crate::processing::Job;

/// Expand `pattern` to the regular files it matches, in glob order.
///
/// Directories are skipped; entries that cannot be read are logged and
/// skipped. A malformed pattern is an error.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|source| GlobResizeError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_dir() => debug!("Skipping directory {:?}", path),
            Ok(path) => files.push(path),
            Err(e) => warn!("Skipping unreadable path {:?}: {}", e.path(), e.error()),
        }
    }

    Ok(files)
}

/// Build one job per file matched by the configured pattern.
///
/// Zero matches is an error; nothing should be scheduled.
pub fn plan_jobs(config: &Config) -> Result<Vec<Job>> {
    let files = expand_pattern(&config.pattern)?;
    if files.is_empty() {
        return Err(GlobResizeError::NoMatches {
            pattern: config.pattern.clone(),
        });
    }

    info!("Found {} files matching {}", files.len(), config.pattern);
    Ok(files
        .into_iter()
        .map(|file| Job::for_source(file, config))
        .collect())
}
