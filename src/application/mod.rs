//! Application layer with services and DTOs.

/// Data transfer objects.
pub mod dto;
/// Loading, visibility and prefetch services.
pub mod services;

pub use dto::{PrefetchOutcome, PrefetchReport, SlotRequest};
pub use services::{
    DEFAULT_PLACEHOLDER_HEIGHT, DEFAULT_PLACEHOLDER_WIDTH, LoaderConfig, MediaLoader, MediaSlot,
    PrefetchBatch, RegionHandle, ViewportTracker, generate_placeholder,
};
