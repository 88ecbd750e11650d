//! Domain entity definitions.

mod cache_entry;
mod geometry;
mod render;

pub use cache_entry::{CACHE_FORMAT_VERSION, CacheEntry, MAX_AGE};
pub use geometry::Rect;
pub use render::{
    FALLBACK_ASSET, FallbackAsset, MediaOrigin, PlaceholderImage, RenderContent, RenderState,
    ResolvedMedia, SlotPhase,
};
