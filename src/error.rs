//! Error types and handling for GlobResize

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for GlobResize operations
pub type Result<T> = std::result::Result<T, GlobResizeError>;

/// Main error type for GlobResize operations
#[derive(Debug, Error)]
pub enum GlobResizeError {
    /// Source file could not be opened or read
    #[error("Error opening file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sniffed content type is neither JPEG nor PNG
    #[error("File {path:?} is of unsupported MIME type {mime}")]
    UnsupportedFormat { mime: String, path: PathBuf },

    /// Decoder rejected the source bytes
    #[error("Error decoding file {path:?} as {format}: {source}")]
    Decode {
        path: PathBuf,
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    /// Passthrough copy failed
    #[error("Failed to copy file from {from:?} to {to:?}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding or writing the destination failed
    #[error("Failed to write destination file {path:?}: {message}")]
    Encode { path: PathBuf, message: String },

    /// A pipeline task panicked or was cancelled
    #[error("Worker task for {path:?} did not complete: {message}")]
    Task { path: PathBuf, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed glob pattern
    #[error("Error opening path/pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Glob pattern matched nothing
    #[error("No files found with pattern {pattern}")]
    NoMatches { pattern: String },

    /// Scheduler was handed an empty job list
    #[error("No jobs to schedule")]
    EmptyBatch,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl GlobResizeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn open(path: &Path, source: std::io::Error) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn unsupported_format<S: Into<String>>(mime: S, path: &Path) -> Self {
        Self::UnsupportedFormat {
            mime: mime.into(),
            path: path.to_path_buf(),
        }
    }

    pub fn copy(from: &Path, to: &Path, source: std::io::Error) -> Self {
        Self::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }
    }

    /// Create a new encode error
    pub fn encode<S: ToString>(path: &Path, message: S) -> Self {
        Self::Encode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn task<S: Into<String>>(path: &Path, message: S) -> Self {
        Self::Task {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Check if this error is scoped to a single job (the batch continues)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Open { .. }
            | Self::UnsupportedFormat { .. }
            | Self::Decode { .. }
            | Self::Copy { .. }
            | Self::Encode { .. }
            | Self::Task { .. } => true,

            Self::Config { .. }
            | Self::Pattern { .. }
            | Self::NoMatches { .. }
            | Self::EmptyBatch
            | Self::Serde(_) => false,
        }
    }

    /// Short stage label used in log lines
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Copy { .. } => "Copy",
            Self::Open { .. }
            | Self::UnsupportedFormat { .. }
            | Self::Decode { .. }
            | Self::Encode { .. }
            | Self::Task { .. } => "Resize",
            _ => "Main",
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedFormat { mime, .. } => {
                format!("Unsupported image format: {}. Supported formats: JPEG, PNG", mime)
            }
            Self::Pattern { pattern, .. } => {
                format!("Malformed glob pattern: {}", pattern)
            }
            Self::NoMatches { pattern } => {
                format!("No files matched pattern {}. Check the path and quoting.", pattern)
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for GlobResizeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serde(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for GlobResizeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serde(format!("YAML parsing error: {}", err))
    }
}
