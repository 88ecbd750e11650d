//! Render-facing types published by display slots.

use bytes::Bytes;

/// Phase of a display slot in its loading lifecycle.
///
/// Phases only move forward: `Placeholder -> Loading -> Resolved | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotPhase {
    /// Waiting for the slot's region to approach the viewport.
    Placeholder,
    /// Consulting the cache or the network.
    Loading,
    /// Real content is available.
    Resolved,
    /// Resolution failed; the fallback asset is shown.
    Failed,
}

impl SlotPhase {
    const fn rank(self) -> u8 {
        match self {
            Self::Placeholder => 0,
            Self::Loading => 1,
            Self::Resolved | Self::Failed => 2,
        }
    }

    /// Returns true if moving from `self` to `next` is a forward transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }

    /// Returns true for `Resolved` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }
}

impl std::fmt::Display for SlotPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placeholder => write!(f, "placeholder"),
            Self::Loading => write!(f, "loading"),
            Self::Resolved => write!(f, "resolved"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A synthetic blurred stand-in image, encoded as a self-contained data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderImage {
    /// Aspect hint width.
    pub width: u32,
    /// Aspect hint height.
    pub height: u32,
    /// `data:image/svg+xml,...` URI requiring no network access.
    pub data_uri: String,
}

/// Static asset shown whenever resolution fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackAsset {
    /// Logical path the asset is served under.
    pub path: &'static str,
    /// MIME type of `bytes`.
    pub content_type: &'static str,
    /// Asset contents, bundled into the binary.
    pub bytes: &'static [u8],
}

/// The fallback asset bundled with the crate.
pub const FALLBACK_ASSET: FallbackAsset = FallbackAsset {
    path: "/placeholder.svg",
    content_type: "image/svg+xml",
    bytes: include_bytes!("../../../assets/placeholder.svg"),
};

/// What the UI layer should draw for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderContent {
    /// Blurred placeholder while the real asset is unresolved.
    Placeholder(PlaceholderImage),
    /// Resolved image bytes.
    Image(Bytes),
    /// Fallback asset after a failure.
    Fallback(FallbackAsset),
}

/// A snapshot of a slot, as projected to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderState {
    /// Lifecycle phase that produced this state.
    pub phase: SlotPhase,
    /// True until the slot reaches a terminal phase.
    pub is_loading: bool,
    /// True only after a failure.
    pub has_error: bool,
    /// Content to draw.
    pub content: RenderContent,
}

impl RenderState {
    /// State of a lazy slot waiting for visibility.
    #[must_use]
    pub const fn placeholder(image: PlaceholderImage) -> Self {
        Self {
            phase: SlotPhase::Placeholder,
            is_loading: true,
            has_error: false,
            content: RenderContent::Placeholder(image),
        }
    }

    /// State of a slot resolving its content. Still shows the placeholder.
    #[must_use]
    pub const fn loading(image: PlaceholderImage) -> Self {
        Self {
            phase: SlotPhase::Loading,
            is_loading: true,
            has_error: false,
            content: RenderContent::Placeholder(image),
        }
    }

    /// State of a slot showing its resolved payload.
    #[must_use]
    pub const fn resolved(payload: Bytes) -> Self {
        Self {
            phase: SlotPhase::Resolved,
            is_loading: false,
            has_error: false,
            content: RenderContent::Image(payload),
        }
    }

    /// State of a slot that failed and shows the fallback asset.
    #[must_use]
    pub const fn failed() -> Self {
        Self {
            phase: SlotPhase::Failed,
            is_loading: false,
            has_error: true,
            content: RenderContent::Fallback(FALLBACK_ASSET),
        }
    }
}

/// Where a resolved payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOrigin {
    /// Served from the persistent cache.
    Cache,
    /// Downloaded from the network.
    Network,
}

impl std::fmt::Display for MediaOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A payload resolved for a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// Image bytes.
    pub payload: Bytes,
    /// Where the bytes came from.
    pub origin: MediaOrigin,
}
