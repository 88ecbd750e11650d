//! Application services: placeholder generation, visibility, loading and prefetch.

mod media_loader;
mod media_slot;
mod placeholder;
mod prefetch;
mod visibility;

pub use media_loader::{LoaderConfig, MediaLoader};
pub use media_slot::MediaSlot;
pub use placeholder::{
    DEFAULT_PLACEHOLDER_HEIGHT, DEFAULT_PLACEHOLDER_WIDTH, default_placeholder,
    generate_placeholder,
};
pub use prefetch::PrefetchBatch;
pub use visibility::{DEFAULT_MARGIN_PX, RegionHandle, ViewportSubscription, ViewportTracker};
