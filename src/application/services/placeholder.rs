//! Blurred placeholder generation.

use crate::domain::entities::PlaceholderImage;

/// Default aspect hint width.
pub const DEFAULT_PLACEHOLDER_WIDTH: u32 = 8;
/// Default aspect hint height.
pub const DEFAULT_PLACEHOLDER_HEIGHT: u32 = 6;

/// Builds a tiny blurred solid-color SVG sized to the given aspect hint.
///
/// Pure and deterministic. Zero dimensions are clamped to 1.
#[must_use]
pub fn generate_placeholder(width: u32, height: u32) -> PlaceholderImage {
    let width = width.max(1);
    let height = height.max(1);
    let data_uri = format!(
        "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 {width} {height}'%3E\
         %3Cfilter id='b' color-interpolation-filters='sRGB'%3E%3CfeGaussianBlur stdDeviation='1'/%3E%3C/filter%3E\
         %3Cg filter='url(%23b)'%3E%3Crect width='{width}' height='{height}' fill='%23a5b4fc'/%3E%3C/g%3E%3C/svg%3E"
    );

    PlaceholderImage {
        width,
        height,
        data_uri,
    }
}

/// Placeholder at the default 8x6 aspect hint.
#[must_use]
pub fn default_placeholder() -> PlaceholderImage {
    generate_placeholder(DEFAULT_PLACEHOLDER_WIDTH, DEFAULT_PLACEHOLDER_HEIGHT)
}
