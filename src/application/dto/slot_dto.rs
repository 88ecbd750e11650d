//! Display slot DTOs.

use crate::application::services::RegionHandle;

/// Request to display one image.
#[derive(Debug, Clone)]
pub struct SlotRequest {
    /// Image URL; identity key for caching.
    pub source_url: String,
    /// Skip visibility gating and load immediately.
    pub priority: bool,
    /// Region the image is drawn in.
    pub region: RegionHandle,
}

impl SlotRequest {
    /// Creates a lazy request deferred until `region` nears the viewport.
    #[must_use]
    pub fn lazy(source_url: impl Into<String>, region: RegionHandle) -> Self {
        Self {
            source_url: source_url.into(),
            priority: false,
            region,
        }
    }

    /// Creates a priority request that loads immediately.
    #[must_use]
    pub fn priority(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            priority: true,
            region: RegionHandle::new(),
        }
    }

    /// Overrides the priority flag.
    #[must_use]
    pub const fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }
}
