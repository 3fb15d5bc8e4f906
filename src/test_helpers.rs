//! Shared test utilities: image fixtures on disk and an instrumented codec.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use image::{DynamicImage, ImageBuffer, ImageResult, Rgb, Rgba};

use crate::config::{Config, ResampleFilter};
use crate::processing::{FormatKind, ImageCodec, NativeCodec};

// =========================================================================
// Fixtures
// =========================================================================

/// Valid configuration with the given pattern and longest side
pub fn test_config(pattern: &str, longest_side: u32) -> Config {
    Config {
        pattern: pattern.to_string(),
        longest_side,
        ..Config::default()
    }
}

/// Write a gradient PNG of `width`x`height` and return its path
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path
}

/// Write a gradient JPEG of `width`x`height` and return its path
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    img.save_with_format(&path, image::ImageFormat::Jpeg).unwrap();
    path
}

/// Write arbitrary bytes and return the path
pub fn write_bytes(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

// =========================================================================
// Instrumented codec
// =========================================================================

/// One decode call as seen by [`InstrumentedCodec`]
#[derive(Debug, Clone, Copy)]
pub struct DecodeEvent {
    /// Width of the decoded image, used to tell fixtures apart
    pub width: u32,
    pub started: Instant,
    pub finished: Instant,
}

/// Wraps [`NativeCodec`], recording decode timings and optionally
/// slowing decodes down or failing every encode.
pub struct InstrumentedCodec {
    inner: NativeCodec,
    decode_delay: Box<dyn Fn(u32) -> Duration + Send + Sync>,
    fail_encode: bool,
    events: Mutex<Vec<DecodeEvent>>,
}

impl InstrumentedCodec {
    /// Every decode sleeps for `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self::with_delay_fn(move |_| delay)
    }

    /// Decode sleep depends on the decoded width
    pub fn with_delay_fn<F>(delay: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            inner: NativeCodec,
            decode_delay: Box::new(delay),
            fail_encode: false,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Decodes normally, refuses every encode
    pub fn failing_encode() -> Self {
        Self {
            fail_encode: true,
            ..Self::with_delay(Duration::ZERO)
        }
    }

    pub fn events(&self) -> Vec<DecodeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ImageCodec for InstrumentedCodec {
    fn sniff(&self, data: &[u8]) -> Result<FormatKind, String> {
        self.inner.sniff(data)
    }

    fn decode(&self, format: FormatKind, data: &[u8]) -> ImageResult<DynamicImage> {
        let started = Instant::now();
        let image = self.inner.decode(format, data)?;
        std::thread::sleep((self.decode_delay)(image.width()));
        self.events.lock().unwrap().push(DecodeEvent {
            width: image.width(),
            started,
            finished: Instant::now(),
        });
        Ok(image)
    }

    fn encode(&self, format: FormatKind, image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
        if self.fail_encode {
            return Err(image::ImageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "encoder refused",
            )));
        }
        self.inner.encode(format, image, quality)
    }

    fn scale(&self, image: &DynamicImage, width: u32, height: u32, filter: ResampleFilter) -> DynamicImage {
        self.inner.scale(image, width, height, filter)
    }
}
