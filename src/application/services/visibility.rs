//! One-shot visibility trigger for deferred loading.
//!
//! A single [`ViewportTracker`] is shared by every slot. Each slot supplies
//! its own [`RegionHandle`] and receives a [`ViewportSubscription`] that
//! completes once the region comes within a margin of the viewport.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::domain::entities::Rect;

/// Default look-ahead margin in pixels.
pub const DEFAULT_MARGIN_PX: f64 = 50.0;

/// Publishes the current viewport to all pending subscriptions.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    viewport: Arc<watch::Sender<Rect>>,
}

impl ViewportTracker {
    /// Creates a tracker for the given viewport.
    #[must_use]
    pub fn new(viewport: Rect) -> Self {
        let (tx, _rx) = watch::channel(viewport);
        Self {
            viewport: Arc::new(tx),
        }
    }

    /// Updates the viewport after a scroll or resize.
    pub fn set_viewport(&self, viewport: Rect) {
        self.viewport.send_replace(viewport);
    }

    /// Returns the current viewport.
    #[must_use]
    pub fn viewport(&self) -> Rect {
        *self.viewport.borrow()
    }

    /// Subscribes `region` for a one-shot visibility notification.
    #[must_use]
    pub fn observe(&self, region: &RegionHandle, margin_px: f64) -> ViewportSubscription {
        let region = region.bounds.subscribe();
        let mounted_at_subscription = region.borrow().is_some();
        ViewportSubscription {
            viewport: self.viewport.subscribe(),
            region,
            mounted_at_subscription,
            margin_px,
        }
    }
}

impl Default for ViewportTracker {
    fn default() -> Self {
        Self::new(Rect::default())
    }
}

/// Bounds of a display region, owned by the UI element that draws it.
///
/// `None` bounds mean the region is not mounted in the render tree.
#[derive(Debug, Clone)]
pub struct RegionHandle {
    bounds: Arc<watch::Sender<Option<Rect>>>,
}

impl RegionHandle {
    /// Creates a handle for a region that is not yet mounted.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            bounds: Arc::new(tx),
        }
    }

    /// Creates a handle for a mounted region.
    #[must_use]
    pub fn with_bounds(bounds: Rect) -> Self {
        let handle = Self::new();
        handle.set_bounds(bounds);
        handle
    }

    /// Updates the region's position after layout.
    pub fn set_bounds(&self, bounds: Rect) {
        self.bounds.send_replace(Some(bounds));
    }

    /// Marks the region as no longer in the render tree.
    pub fn unmount(&self) {
        self.bounds.send_replace(None);
    }

    /// Returns the current bounds, if mounted.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        *self.bounds.borrow()
    }
}

impl Default for RegionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A pending one-shot visibility notification.
///
/// Dropping it (or the future returned by [`wait`](Self::wait)) tears the
/// observation down.
#[derive(Debug)]
pub struct ViewportSubscription {
    viewport: watch::Receiver<Rect>,
    region: watch::Receiver<Option<Rect>>,
    mounted_at_subscription: bool,
    margin_px: f64,
}

impl ViewportSubscription {
    /// Returns true if the region currently intersects the expanded viewport.
    #[must_use]
    pub fn is_intersecting(&self) -> bool {
        let viewport = self.viewport.borrow().expand(self.margin_px);
        self.region
            .borrow()
            .is_some_and(|bounds| bounds.intersects(&viewport))
    }

    /// Completes once the region intersects the viewport expanded by the margin.
    ///
    /// Fails open: completes immediately when the region was not mounted at
    /// subscription time, or when the tracker or region owner goes away. A
    /// region unmounted after subscribing keeps waiting.
    pub async fn wait(mut self) {
        if !self.mounted_at_subscription {
            debug!("Region not mounted at subscription time, firing immediately");
            return;
        }

        loop {
            let viewport = self.viewport.borrow_and_update().expand(self.margin_px);
            let region = *self.region.borrow_and_update();
            if region.is_some_and(|bounds| bounds.intersects(&viewport)) {
                trace!(margin_px = self.margin_px, "Region became visible");
                return;
            }

            tokio::select! {
                changed = self.viewport.changed() => {
                    if changed.is_err() {
                        debug!("Viewport tracker dropped, firing immediately");
                        return;
                    }
                }
                changed = self.region.changed() => {
                    if changed.is_err() {
                        debug!("Region handle dropped, firing immediately");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn screen() -> Rect {
        Rect::new(0.0, 0.0, 400.0, 800.0)
    }

    async fn completes(subscription: ViewportSubscription) -> bool {
        tokio::time::timeout(Duration::from_millis(50), subscription.wait())
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn test_unmounted_region_fires_immediately() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::new();

        assert!(completes(tracker.observe(&region, DEFAULT_MARGIN_PX)).await);
    }

    #[tokio::test]
    async fn test_visible_region_fires_immediately() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::with_bounds(Rect::new(0.0, 100.0, 200.0, 100.0));

        let subscription = tracker.observe(&region, DEFAULT_MARGIN_PX);
        assert!(subscription.is_intersecting());
        assert!(completes(subscription).await);
    }

    #[tokio::test]
    async fn test_margin_extends_viewport() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::with_bounds(Rect::new(0.0, 840.0, 200.0, 100.0));

        assert!(completes(tracker.observe(&region, 50.0)).await);
        assert!(!completes(tracker.observe(&region, 10.0)).await);
    }

    #[tokio::test]
    async fn test_fires_after_scroll() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::with_bounds(Rect::new(0.0, 3000.0, 200.0, 100.0));

        let handle = tokio::spawn(tracker.observe(&region, DEFAULT_MARGIN_PX).wait());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        tracker.set_viewport(Rect::new(0.0, 1000.0, 400.0, 800.0));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        tracker.set_viewport(Rect::new(0.0, 2500.0, 400.0, 800.0));
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("subscription did not fire")
            .unwrap();
    }

    #[tokio::test]
    async fn test_fires_after_region_moves() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::with_bounds(Rect::new(0.0, 3000.0, 200.0, 100.0));

        let handle = tokio::spawn(tracker.observe(&region, DEFAULT_MARGIN_PX).wait());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        region.set_bounds(Rect::new(0.0, 300.0, 200.0, 100.0));
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("subscription did not fire")
            .unwrap();
    }

    #[tokio::test]
    async fn test_region_unmounted_mid_wait_keeps_waiting() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::with_bounds(Rect::new(0.0, 3000.0, 200.0, 100.0));

        let handle = tokio::spawn(tracker.observe(&region, DEFAULT_MARGIN_PX).wait());
        region.unmount();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn test_unmounted_before_first_poll_keeps_waiting() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::with_bounds(Rect::new(0.0, 3000.0, 200.0, 100.0));

        let subscription = tracker.observe(&region, DEFAULT_MARGIN_PX);
        region.unmount();

        assert!(!completes(subscription).await);
    }

    #[tokio::test]
    async fn test_dropped_tracker_fires_pending_wait() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::with_bounds(Rect::new(0.0, 3000.0, 200.0, 100.0));

        let handle = tokio::spawn(tracker.observe(&region, DEFAULT_MARGIN_PX).wait());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        drop(tracker);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait did not fire after tracker dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_region_owner_fires_pending_wait() {
        let tracker = ViewportTracker::new(screen());
        let region = RegionHandle::with_bounds(Rect::new(0.0, 3000.0, 200.0, 100.0));
        let region_clone = region.clone();

        let handle = tokio::spawn(tracker.observe(&region, DEFAULT_MARGIN_PX).wait());
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(region);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        drop(region_clone);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait did not fire after region dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscriptions_are_independent() {
        let tracker = ViewportTracker::new(screen());
        let near = RegionHandle::with_bounds(Rect::new(0.0, 900.0, 200.0, 100.0));
        let far = RegionHandle::with_bounds(Rect::new(0.0, 5000.0, 200.0, 100.0));

        let far_handle = tokio::spawn(tracker.observe(&far, DEFAULT_MARGIN_PX).wait());
        let near_handle = tokio::spawn(tracker.observe(&near, DEFAULT_MARGIN_PX).wait());

        tracker.set_viewport(Rect::new(0.0, 200.0, 400.0, 800.0));
        tokio::time::timeout(Duration::from_secs(1), near_handle)
            .await
            .expect("near region did not fire")
            .unwrap();
        assert!(!far_handle.is_finished());
        far_handle.abort();
    }
}
