//! Longest-side resize policy and filter selection

use crate::config::ResampleFilter;

/// Outcome of the longest-side policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeDecision {
    /// Both sides already fit; the source is copied as-is
    NoResizeNeeded,
    /// Scale to exactly these dimensions
    ResizeTo { width: u32, height: u32 },
}

/// Decide whether an image must shrink so its longest side equals `longest_side`.
///
/// The boundary is inclusive: an image whose longest side equals the target
/// is left alone. The shorter side is `target * short / long` rounded half
/// away from zero, computed in integer arithmetic so tie points are exact,
/// and never drops below one pixel.
pub fn decide(width: u32, height: u32, longest_side: u32) -> ResizeDecision {
    if width <= longest_side && height <= longest_side {
        return ResizeDecision::NoResizeNeeded;
    }

    if width >= height {
        ResizeDecision::ResizeTo {
            width: longest_side,
            height: scale_short_side(longest_side, height, width),
        }
    } else {
        ResizeDecision::ResizeTo {
            width: scale_short_side(longest_side, width, height),
            height: longest_side,
        }
    }
}

fn scale_short_side(target: u32, short: u32, long: u32) -> u32 {
    let numerator = 2 * u128::from(target) * u128::from(short) + u128::from(long);
    let rounded = numerator / (2 * u128::from(long));
    // rounded <= target because short <= long
    (rounded as u32).max(1)
}

impl From<ResampleFilter> for image::imageops::FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Fast => image::imageops::FilterType::Triangle,
            ResampleFilter::HighQuality => image::imageops::FilterType::CatmullRom,
        }
    }
}
