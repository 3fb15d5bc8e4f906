//! Image format detection by content sniffing

use std::fmt;
use serde::{Deserialize, Serialize};

/// MIME type reported when the content matches no known signature
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// The two raster formats the pipeline reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Lossy; honours the configured quality
    Jpeg,
    /// Lossless; quality has no effect
    Png,
}

impl FormatKind {
    /// Get MIME type for this format
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPG",
            Self::Png => "PNG",
        }
    }

    /// Map a MIME type back to a supported format
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<FormatKind> for image::ImageFormat {
    fn from(format: FormatKind) -> Self {
        match format {
            FormatKind::Jpeg => image::ImageFormat::Jpeg,
            FormatKind::Png => image::ImageFormat::Png,
        }
    }
}

/// Detect the MIME type of `data` from its magic bytes
pub fn detect_mime(data: &[u8]) -> &'static str {
    infer::get(data)
        .map(|kind| kind.mime_type())
        .unwrap_or(UNKNOWN_MIME)
}

/// Sniff `data`, returning the supported format or the MIME type that was found
pub fn sniff_format(data: &[u8]) -> std::result::Result<FormatKind, &'static str> {
    let mime = detect_mime(data);
    FormatKind::from_mime(mime).ok_or(mime)
}
