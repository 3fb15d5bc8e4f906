//! Configuration management for GlobResize

use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, GlobResizeError};

/// Default destination file prefix
pub const DEFAULT_PREFIX: &str = "resized_";
/// Default longest-side target in pixels
pub const DEFAULT_LONGEST_SIDE: u32 = 2560;
/// Default JPEG quality
pub const DEFAULT_QUALITY: u8 = 100;
/// Default number of simultaneous jobs
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Main configuration structure, immutable once resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Glob pattern selecting source files
    pub pattern: String,

    /// String prepended to each destination file name
    pub prefix: String,

    /// Longest side, in pixels, an output image may have
    pub longest_side: u32,

    /// JPEG encode quality (1-100); PNG output ignores it
    pub quality: u8,

    /// Maximum number of images processed at once
    pub concurrency: usize,

    /// Resampling filter used when shrinking
    pub filter: ResampleFilter,

    /// How jobs are fed to workers
    pub strategy: SchedulingStrategy,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            prefix: DEFAULT_PREFIX.to_string(),
            longest_side: DEFAULT_LONGEST_SIDE,
            quality: DEFAULT_QUALITY,
            concurrency: DEFAULT_CONCURRENCY,
            filter: ResampleFilter::default(),
            strategy: SchedulingStrategy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Resampling filter selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    /// Bilinear interpolation
    #[default]
    Fast,
    /// Catmull-Rom cubic interpolation
    HighQuality,
}

/// Scheduling strategy for the batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingStrategy {
    /// Consecutive chunks of `concurrency` jobs separated by a full barrier
    #[default]
    Chunked,
    /// Fixed worker pool pulling from a bounded queue
    Pool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Values supplied on the command line; `None` leaves the loaded value alone
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub pattern: Option<String>,
    pub prefix: Option<String>,
    pub longest_side: Option<u32>,
    pub quality: Option<u8>,
    pub concurrency: Option<usize>,
    pub high_quality: bool,
    pub strategy: Option<SchedulingStrategy>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from a `.toml`, `.yaml` or `.yml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| GlobResizeError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        match config_extension(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(GlobResizeError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match config_extension(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| GlobResizeError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| GlobResizeError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(GlobResizeError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| GlobResizeError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Layer command-line values on top of this configuration
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(pattern) = overrides.pattern {
            self.pattern = pattern;
        }
        if let Some(prefix) = overrides.prefix {
            self.prefix = prefix;
        }
        if let Some(longest_side) = overrides.longest_side {
            self.longest_side = longest_side;
        }
        if let Some(quality) = overrides.quality {
            self.quality = quality;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if overrides.high_quality {
            self.filter = ResampleFilter::HighQuality;
        }
        if let Some(strategy) = overrides.strategy {
            self.strategy = strategy;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(GlobResizeError::config("No file glob pattern provided"));
        }

        if self.prefix.is_empty() {
            return Err(GlobResizeError::config(
                "Prefix must not be empty; outputs would overwrite their sources"
            ));
        }

        if self.prefix.contains(std::path::is_separator) {
            return Err(GlobResizeError::config(format!(
                "Prefix '{}' must not contain a path separator", self.prefix
            )));
        }

        if self.longest_side == 0 {
            return Err(GlobResizeError::config(
                "Longest side must be greater than 0"
            ));
        }

        if !(1..=100).contains(&self.quality) {
            return Err(GlobResizeError::config(
                "Quality must be between 1 and 100"
            ));
        }

        if self.concurrency == 0 {
            return Err(GlobResizeError::config(
                "Concurrency must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Destination path for a source file: same directory, prefixed name
    pub fn destination_for(&self, source: &Path) -> PathBuf {
        let mut file_name = std::ffi::OsString::from(&self.prefix);
        if let Some(name) = source.file_name() {
            file_name.push(name);
        }
        match source.parent() {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===")?;
        writeln!(f, "File Glob Pattern = {}", self.pattern)?;
        writeln!(f, "Resized Filename Prefix = {}", self.prefix)?;
        writeln!(f, "Long Side in Pixel = {}", self.longest_side)?;
        writeln!(f, "JPEG Quality = {}", self.quality)?;
        writeln!(f, "Concurrency = {}", self.concurrency)?;
        writeln!(f, "Use CatmullRom Resize = {}", self.filter == ResampleFilter::HighQuality)?;
        writeln!(f, "Scheduling = {:?}", self.strategy)?;
        write!(f, "===")
    }
}

fn config_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid() -> Config {
        Config {
            pattern: "photos/*.jpg".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.prefix, "resized_");
        assert_eq!(config.longest_side, 2560);
        assert_eq!(config.quality, 100);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.filter, ResampleFilter::Fast);
        assert_eq!(config.strategy, SchedulingStrategy::Chunked);
        // no pattern yet
        assert!(config.validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(Config { longest_side: 0, ..valid() }.validate().is_err());
        assert!(Config { quality: 0, ..valid() }.validate().is_err());
        assert!(Config { quality: 101, ..valid() }.validate().is_err());
        assert!(Config { concurrency: 0, ..valid() }.validate().is_err());
        assert!(Config { prefix: "out/".to_string(), ..valid() }.validate().is_err());
        assert!(Config { prefix: String::new(), ..valid() }.validate().is_err());
        assert!(Config { pattern: "   ".to_string(), ..valid() }.validate().is_err());
    }

    #[test]
    fn test_overrides_only_touch_given_values() {
        let base = Config {
            quality: 80,
            ..valid()
        };
        let merged = base.clone().apply_overrides(ConfigOverrides {
            concurrency: Some(8),
            high_quality: true,
            ..Default::default()
        });

        assert_eq!(merged.quality, 80);
        assert_eq!(merged.pattern, base.pattern);
        assert_eq!(merged.concurrency, 8);
        assert_eq!(merged.filter, ResampleFilter::HighQuality);
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            strategy: SchedulingStrategy::Pool,
            ..valid()
        };

        let toml_path = dir.path().join("globresize.toml");
        config.to_file(&toml_path).unwrap();
        assert_eq!(Config::from_file(&toml_path).unwrap(), config);

        let yaml_path = dir.path().join("globresize.yaml");
        config.to_file(&yaml_path).unwrap();
        assert_eq!(Config::from_file(&yaml_path).unwrap(), config);

        assert!(config.to_file(dir.path().join("globresize.ini")).is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "pattern = \"*.png\"\nfilter = \"high_quality\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.pattern, "*.png");
        assert_eq!(config.filter, ResampleFilter::HighQuality);
        assert_eq!(config.longest_side, DEFAULT_LONGEST_SIDE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_destination_for() {
        let config = valid();
        assert_eq!(
            config.destination_for(Path::new("photos/trip/a.jpg")),
            PathBuf::from("photos/trip/resized_a.jpg")
        );
        assert_eq!(
            config.destination_for(Path::new("b.png")),
            PathBuf::from("resized_b.png")
        );
    }

    #[test]
    fn test_banner() {
        let banner = valid().to_string();
        assert!(banner.starts_with("==="));
        assert!(banner.contains("File Glob Pattern = photos/*.jpg"));
        assert!(banner.contains("Use CatmullRom Resize = false"));
    }
}
