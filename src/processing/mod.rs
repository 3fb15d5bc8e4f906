//! Per-file image pipeline: read, sniff, decode, then resize or copy

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, GlobResizeError};

pub mod codec;
pub mod formats;
pub mod memory;
pub mod resize;

pub use codec::*;
pub use formats::*;
pub use memory::*;
pub use resize::*;

/// One source file and where its result goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Job {
    pub fn new<S: Into<PathBuf>, D: Into<PathBuf>>(source: S, destination: D) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Build the job for `source` using the configured destination prefix
    pub fn for_source<P: Into<PathBuf>>(source: P, config: &Config) -> Self {
        let source = source.into();
        let destination = config.destination_for(&source);
        Self { source, destination }
    }
}

/// What the pipeline did with a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Source already fit; copied byte-for-byte
    Copied { bytes: u64 },
    /// Source was scaled and re-encoded in its own format
    Resized {
        format: FormatKind,
        from: (u32, u32),
        to: (u32, u32),
        bytes: u64,
    },
}

impl JobOutcome {
    /// Bytes written to the destination
    pub fn bytes_written(&self) -> u64 {
        match self {
            Self::Copied { bytes } | Self::Resized { bytes, .. } => *bytes,
        }
    }
}

/// Processes a single job at a time; shared read-only across workers
pub struct ImagePipeline {
    config: Arc<Config>,
    codec: Arc<dyn ImageCodec>,
    gauge: Arc<MemoryGauge>,
}

impl ImagePipeline {
    /// Create a pipeline using the `image` crate codec
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_codec(config, Arc::new(NativeCodec))
    }

    /// Create a pipeline with a custom codec
    pub fn with_codec(config: Arc<Config>, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            config,
            codec,
            gauge: Arc::new(MemoryGauge::new()),
        }
    }

    /// Gauge of decoded rasters held by this pipeline's invocations
    pub fn gauge(&self) -> &Arc<MemoryGauge> {
        &self.gauge
    }

    /// Run one job to completion.
    ///
    /// Nothing is written unless the source opens, sniffs as JPEG or PNG and
    /// decodes. All buffers are dropped before this returns, whatever the
    /// outcome.
    pub fn process(&self, job: &Job) -> Result<JobOutcome> {
        let start_time = Instant::now();
        let source = job.source.as_path();
        debug!("Processing file: {:?} -> {:?}", source, job.destination);

        let data = read_source(source)?;

        let format = self.codec.sniff(&data)
            .map_err(|mime| GlobResizeError::unsupported_format(mime, source))?;

        let decoded = self.decode(format, data, source)?;
        let (width, height) = decoded.dimensions();

        let outcome = match decide(width, height, self.config.longest_side) {
            ResizeDecision::NoResizeNeeded => {
                drop(decoded);
                info!("No resize required. Copying {} -> {}",
                      source.display(), job.destination.display());
                let bytes = copy_file(source, &job.destination)?;
                info!("Copied {} bytes from {} to {}",
                      bytes, source.display(), job.destination.display());
                JobOutcome::Copied { bytes }
            }
            ResizeDecision::ResizeTo { width: new_width, height: new_height } => {
                info!("Resizing {} ({}x{} -> {}x{})...",
                      source.display(), width, height, new_width, new_height);
                let scaled = self.codec.scale(&decoded, new_width, new_height, self.config.filter);
                drop(decoded);

                info!("Writing to {}...", job.destination.display());
                let bytes = self.encode_to(format, &scaled, &job.destination)?;
                JobOutcome::Resized {
                    format,
                    from: (width, height),
                    to: (new_width, new_height),
                    bytes,
                }
            }
        };

        debug!("Finished {:?} in {:.2}s", source, start_time.elapsed().as_secs_f64());
        Ok(outcome)
    }

    /// Decode `data`, consuming it so the encoded bytes are freed right away
    fn decode(&self, format: FormatKind, data: Vec<u8>, path: &Path) -> Result<DecodedImage> {
        let image = self.codec.decode(format, &data)
            .map_err(|source| GlobResizeError::Decode {
                path: path.to_path_buf(),
                format: format.name(),
                source,
            })?;
        drop(data);

        Ok(DecodedImage::new(image, Arc::clone(&self.gauge)))
    }

    fn encode_to(
        &self,
        format: FormatKind,
        image: &image::DynamicImage,
        destination: &Path,
    ) -> Result<u64> {
        let quality = if format.is_lossy() { self.config.quality } else { 100 };
        let encoded = self.codec.encode(format, image, quality)
            .map_err(|e| GlobResizeError::encode(destination, e))?;

        write_atomically(destination, &encoded)
            .map_err(|e| GlobResizeError::encode(destination, e))?;

        Ok(encoded.len() as u64)
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    let mut file = fs::File::open(path)
        .map_err(|e| GlobResizeError::open(path, e))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| GlobResizeError::open(path, e))?;
    Ok(data)
}

/// Byte-for-byte copy, re-reading the source from disk
fn copy_file(source: &Path, destination: &Path) -> Result<u64> {
    fs::copy(source, destination)
        .map_err(|e| GlobResizeError::copy(source, destination, e))
}

/// Hidden sibling path used while a destination is being written
pub fn partial_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.partial", name))
}

/// Write `bytes` next to `destination` and rename into place on success
fn write_atomically(destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let temp = partial_path(destination);

    let result = fs::File::create(&temp)
        .and_then(|mut file| file.write_all(bytes))
        .and_then(|()| fs::rename(&temp, destination));

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn pipeline(longest_side: u32) -> ImagePipeline {
        ImagePipeline::new(Arc::new(test_config("*", longest_side)))
    }

    #[test]
    fn test_job_for_source() {
        let config = test_config("*", 100);
        let job = Job::for_source("shots/x.png", &config);
        assert_eq!(job.source, PathBuf::from("shots/x.png"));
        assert_eq!(job.destination, PathBuf::from("shots/resized_x.png"));
    }

    #[test]
    fn test_resize_jpeg_keeps_format() {
        let dir = TempDir::new().unwrap();
        let source = write_jpeg(dir.path(), "wide.jpg", 400, 200);
        let job = Job::for_source(&source, &test_config("*", 100));

        let outcome = pipeline(100).process(&job).unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Resized { format: FormatKind::Jpeg, from: (400, 200), to: (100, 50), .. }
        ));

        let written = fs::read(&job.destination).unwrap();
        assert_eq!(outcome.bytes_written(), written.len() as u64);
        assert_eq!(sniff_format(&written), Ok(FormatKind::Jpeg));
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn test_resize_png_keeps_format() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "tall.png", 60, 300);
        let job = Job::for_source(&source, &test_config("*", 150));

        pipeline(150).process(&job).unwrap();

        let written = fs::read(&job.destination).unwrap();
        assert_eq!(sniff_format(&written), Ok(FormatKind::Png));
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 150));
    }

    #[test]
    fn test_format_comes_from_content_not_extension() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "lies.jpg", 300, 300);
        let job = Job::for_source(&source, &test_config("*", 100));

        pipeline(100).process(&job).unwrap();

        let written = fs::read(&job.destination).unwrap();
        assert_eq!(sniff_format(&written), Ok(FormatKind::Png));
    }

    #[test]
    fn test_small_image_is_copied_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let source = write_jpeg(dir.path(), "small.jpg", 80, 60);
        let job = Job::for_source(&source, &test_config("*", 80));

        let outcome = pipeline(80).process(&job).unwrap();

        let original = fs::read(&source).unwrap();
        assert_eq!(outcome, JobOutcome::Copied { bytes: original.len() as u64 });
        assert_eq!(fs::read(&job.destination).unwrap(), original);
    }

    #[test]
    fn test_unsupported_format_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let source = write_bytes(dir.path(), "notes.png", b"plain text pretending to be a png");
        let job = Job::for_source(&source, &test_config("*", 100));

        let err = pipeline(100).process(&job).unwrap_err();
        assert!(matches!(err, GlobResizeError::UnsupportedFormat { ref mime, .. } if mime == UNKNOWN_MIME));
        assert!(!job.destination.exists());
    }

    #[test]
    fn test_missing_source_is_open_error() {
        let dir = TempDir::new().unwrap();
        let job = Job::for_source(dir.path().join("gone.jpg"), &test_config("*", 100));

        let err = pipeline(100).process(&job).unwrap_err();
        assert!(matches!(err, GlobResizeError::Open { .. }));
        assert!(!job.destination.exists());
    }

    #[test]
    fn test_corrupt_image_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(&[0u8; 64]);
        let source = write_bytes(dir.path(), "broken.jpg", &bytes);
        let job = Job::for_source(&source, &test_config("*", 100));

        let pipeline = pipeline(100);
        let err = pipeline.process(&job).unwrap_err();
        assert!(matches!(err, GlobResizeError::Decode { format: "JPG", .. }));
        assert!(!job.destination.exists());
        assert_eq!(pipeline.gauge().in_flight(), 0);
    }

    #[test]
    fn test_failed_encode_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "big.png", 200, 100);
        let job = Job::for_source(&source, &test_config("*", 50));

        let codec = Arc::new(InstrumentedCodec::failing_encode());
        let pipeline = ImagePipeline::with_codec(Arc::new(test_config("*", 50)), codec);

        let err = pipeline.process(&job).unwrap_err();
        assert!(matches!(err, GlobResizeError::Encode { .. }));
        assert!(!job.destination.exists());
        assert!(!partial_path(&job.destination).exists());
        assert_eq!(pipeline.gauge().in_flight(), 0);
    }

    #[test]
    fn test_unwritable_destination_is_encode_error() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "big.png", 200, 100);
        let job = Job::new(&source, dir.path().join("missing-dir").join("out.png"));

        let err = pipeline(50).process(&job).unwrap_err();
        assert!(matches!(err, GlobResizeError::Encode { .. }));
    }

    #[test]
    fn test_copy_into_missing_directory_is_copy_error() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "tiny.png", 10, 10);
        let job = Job::new(&source, dir.path().join("missing-dir").join("out.png"));

        let err = pipeline(50).process(&job).unwrap_err();
        assert!(matches!(err, GlobResizeError::Copy { .. }));
    }

    #[test]
    fn test_existing_destination_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "big.png", 200, 100);
        let job = Job::for_source(&source, &test_config("*", 50));
        fs::write(&job.destination, b"stale").unwrap();

        pipeline(50).process(&job).unwrap();
        let decoded = image::open(&job.destination).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 25));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("dir/resized_a.jpg")),
            PathBuf::from("dir/.resized_a.jpg.partial")
        );
    }
}
