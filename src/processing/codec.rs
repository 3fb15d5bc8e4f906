//! Narrow interface over the imaging library
//!
//! The pipeline only ever talks to an [`ImageCodec`]: sniff the bytes, decode
//! them, scale the raster and encode it back. [`NativeCodec`] is the
//! production implementation on top of the `image` and `infer` crates.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageResult};

use crate::config::ResampleFilter;
use crate::processing::formats::{sniff_format, FormatKind};

/// Codec operations used by the image pipeline
pub trait ImageCodec: Send + Sync {
    /// Identify the format from content; `Err` carries the detected MIME type
    fn sniff(&self, data: &[u8]) -> std::result::Result<FormatKind, String>;

    /// Decode `data` as `format`
    fn decode(&self, format: FormatKind, data: &[u8]) -> ImageResult<DynamicImage>;

    /// Encode `image` as `format`; `quality` only affects lossy formats
    fn encode(&self, format: FormatKind, image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>>;

    /// Scale `image` to exactly `width`x`height`
    fn scale(&self, image: &DynamicImage, width: u32, height: u32, filter: ResampleFilter) -> DynamicImage;
}

/// Codec backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCodec;

impl ImageCodec for NativeCodec {
    fn sniff(&self, data: &[u8]) -> std::result::Result<FormatKind, String> {
        sniff_format(data).map_err(str::to_string)
    }

    fn decode(&self, format: FormatKind, data: &[u8]) -> ImageResult<DynamicImage> {
        image::load_from_memory_with_format(data, format.into())
    }

    fn encode(&self, format: FormatKind, image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
        let mut output = Vec::new();
        let (width, height) = (image.width(), image.height());

        match format {
            FormatKind::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut output, quality);
                // JPEG carries no alpha channel
                match image {
                    DynamicImage::ImageLuma8(gray) => {
                        encoder.write_image(gray.as_raw(), width, height, ColorType::L8)?;
                    }
                    DynamicImage::ImageRgb8(rgb) => {
                        encoder.write_image(rgb.as_raw(), width, height, ColorType::Rgb8)?;
                    }
                    other => {
                        let rgb = other.to_rgb8();
                        encoder.write_image(rgb.as_raw(), width, height, ColorType::Rgb8)?;
                    }
                }
            }
            FormatKind::Png => {
                let encoder = PngEncoder::new(&mut output);
                encoder.write_image(image.as_bytes(), width, height, image.color())?;
            }
        }

        Ok(output)
    }

    fn scale(&self, image: &DynamicImage, width: u32, height: u32, filter: ResampleFilter) -> DynamicImage {
        image.resize_exact(width, height, filter.into())
    }
}
