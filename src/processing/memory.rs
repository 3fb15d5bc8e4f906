//! Scoped ownership of decoded rasters
//!
//! Every decoded image lives inside a [`DecodedImage`] guard registered with a
//! shared [`MemoryGauge`]. Dropping the guard frees the raster and releases
//! its slot on the gauge, on success and error paths alike, so the gauge's
//! peak is the true high-water mark of rasters held at once.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

/// Counts decoded rasters currently alive across all pipeline instances
#[derive(Debug, Default)]
pub struct MemoryGauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    bytes_in_flight: AtomicU64,
    total_acquired: AtomicUsize,
}

impl MemoryGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasters alive right now
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest simultaneous raster count observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Approximate bytes held by live rasters
    pub fn bytes_in_flight(&self) -> u64 {
        self.bytes_in_flight.load(Ordering::SeqCst)
    }

    /// Rasters ever registered
    pub fn total_acquired(&self) -> usize {
        self.total_acquired.load(Ordering::SeqCst)
    }

    fn acquire(&self, bytes: u64) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.bytes_in_flight.fetch_add(bytes, Ordering::SeqCst);
        self.total_acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self, bytes: u64) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.bytes_in_flight.fetch_sub(bytes, Ordering::SeqCst);
    }
}

/// A decoded raster owned by exactly one pipeline invocation
pub struct DecodedImage {
    image: DynamicImage,
    bytes: u64,
    gauge: Arc<MemoryGauge>,
}

impl DecodedImage {
    /// Take ownership of `image` and register it with `gauge`
    pub fn new(image: DynamicImage, gauge: Arc<MemoryGauge>) -> Self {
        let bytes = raster_bytes(&image);
        gauge.acquire(bytes);
        debug!("Raster acquired: {}x{} ({} bytes, {} in flight)",
               image.width(), image.height(), bytes, gauge.in_flight());
        Self { image, bytes, gauge }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

impl Deref for DecodedImage {
    type Target = DynamicImage;

    fn deref(&self) -> &DynamicImage {
        &self.image
    }
}

impl Drop for DecodedImage {
    fn drop(&mut self) {
        self.gauge.release(self.bytes);
        debug!("Raster released ({} bytes)", self.bytes);
    }
}

/// Bytes occupied by the pixel data of `image`
pub fn raster_bytes(image: &DynamicImage) -> u64 {
    u64::from(image.width())
        * u64::from(image.height())
        * u64::from(image.color().bytes_per_pixel())
}

/// Rough worst-case bytes for one slot: a source raster at `source_side` and
/// an RGBA raster at the target size, both alive while scaling
pub fn estimate_slot_bytes(source_side: u32, longest_side: u32) -> u64 {
    let source = u64::from(source_side) * u64::from(source_side) * 4;
    let target = u64::from(longest_side) * u64::from(longest_side) * 4;
    source + target
}
