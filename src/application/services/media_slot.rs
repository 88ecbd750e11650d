//! Display slots: one image instance tracked through its loading lifecycle.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::application::dto::SlotRequest;
use crate::domain::entities::{PlaceholderImage, RenderState};

use super::media_loader::MediaLoader;
use super::placeholder::generate_placeholder;
use super::visibility::{RegionHandle, ViewportSubscription};

struct SlotCell {
    generation: u64,
    disposed: bool,
    current: RenderState,
}

/// State shared between a slot and its driver task.
///
/// The generation check and the publish happen under one lock, so a
/// superseded driver can never overwrite a newer generation's state.
struct SlotShared {
    cell: Mutex<SlotCell>,
    events: mpsc::UnboundedSender<RenderState>,
}

impl SlotShared {
    fn new(initial: RenderState, events: mpsc::UnboundedSender<RenderState>) -> Self {
        Self {
            cell: Mutex::new(SlotCell {
                generation: 0,
                disposed: false,
                current: initial,
            }),
            events,
        }
    }

    /// Starts a new generation at `initial` and returns its number.
    fn begin_generation(&self, initial: RenderState) -> u64 {
        let mut cell = self.cell.lock();
        cell.generation += 1;
        cell.current = initial.clone();
        let _ = self.events.send(initial);
        cell.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        let cell = self.cell.lock();
        !cell.disposed && cell.generation == generation
    }

    /// Publishes `next` if `generation` is current and the move is forward.
    fn publish(&self, generation: u64, next: RenderState) -> bool {
        let mut cell = self.cell.lock();
        if cell.disposed || cell.generation != generation {
            trace!(generation, "Discarding update for superseded slot");
            return false;
        }
        if !cell.current.phase.can_advance_to(next.phase) {
            warn!(from = %cell.current.phase, to = %next.phase, "Rejected backward slot transition");
            return false;
        }
        cell.current = next.clone();
        let _ = self.events.send(next);
        true
    }

    fn dispose(&self) {
        self.cell.lock().disposed = true;
    }

    fn current(&self) -> RenderState {
        self.cell.lock().current.clone()
    }
}

/// A mounted image display slot.
///
/// Exclusively owned by the UI element drawing it. Dropping the slot cancels
/// a pending visibility wait; a fetch already in flight may still complete
/// and populate the cache, but its result is never published.
pub struct MediaSlot {
    loader: MediaLoader,
    shared: Arc<SlotShared>,
    source_url: String,
    priority: bool,
    cancel: Option<oneshot::Sender<()>>,
}

impl std::fmt::Debug for MediaSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSlot")
            .field("source_url", &self.source_url)
            .field("priority", &self.priority)
            .field("phase", &self.shared.current().phase)
            .finish_non_exhaustive()
    }
}

impl MediaSlot {
    pub(super) fn mount(
        loader: MediaLoader,
        request: SlotRequest,
    ) -> (Self, mpsc::UnboundedReceiver<RenderState>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let placeholder = placeholder_for(&loader);
        let shared = Arc::new(SlotShared::new(
            RenderState::placeholder(placeholder),
            events_tx,
        ));

        let mut slot = Self {
            loader,
            shared,
            source_url: request.source_url.clone(),
            priority: request.priority,
            cancel: None,
        };
        slot.start(request);
        (slot, events_rx)
    }

    /// Re-targets the slot. Returns false if the URL is unchanged.
    ///
    /// A request for the current URL is ignored even if its priority or region
    /// differ; use [`reload`](Self::reload) to restart with a new region. A new
    /// URL re-enters the lifecycle at the placeholder; results still in flight
    /// for the previous URL are discarded on arrival.
    pub fn set_source(&mut self, request: SlotRequest) -> bool {
        if request.source_url == self.source_url {
            return false;
        }
        self.start(request);
        true
    }

    /// Restarts the lifecycle for the current URL.
    pub fn reload(&mut self, region: RegionHandle) {
        let request = SlotRequest {
            source_url: self.source_url.clone(),
            priority: self.priority,
            region,
        };
        self.start(request);
    }

    /// Returns the URL currently displayed.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Returns true for priority slots.
    #[must_use]
    pub const fn is_priority(&self) -> bool {
        self.priority
    }

    /// Returns the latest published render state.
    #[must_use]
    pub fn render_state(&self) -> RenderState {
        self.shared.current()
    }

    /// Tears the slot down. Equivalent to dropping it.
    pub fn dispose(self) {
        drop(self);
    }

    fn start(&mut self, request: SlotRequest) {
        self.cancel.take();

        let placeholder = placeholder_for(&self.loader);
        let initial = if request.priority {
            RenderState::loading(placeholder.clone())
        } else {
            RenderState::placeholder(placeholder.clone())
        };
        let generation = self.shared.begin_generation(initial);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.cancel = Some(cancel_tx);
        self.source_url.clone_from(&request.source_url);
        self.priority = request.priority;

        debug!(
            url = %request.source_url,
            priority = request.priority,
            generation,
            "Mounted media slot"
        );

        let visibility = (!request.priority).then(|| {
            self.loader
                .viewport()
                .observe(&request.region, self.loader.config().visibility_margin_px)
        });

        tokio::spawn(drive(
            self.loader.clone(),
            Arc::clone(&self.shared),
            generation,
            request,
            visibility,
            placeholder,
            cancel_rx,
        ));
    }
}

impl Drop for MediaSlot {
    fn drop(&mut self) {
        self.shared.dispose();
        self.cancel.take();
    }
}

fn placeholder_for(loader: &MediaLoader) -> PlaceholderImage {
    let config = loader.config();
    generate_placeholder(config.placeholder_width, config.placeholder_height)
}

async fn drive(
    loader: MediaLoader,
    shared: Arc<SlotShared>,
    generation: u64,
    request: SlotRequest,
    visibility: Option<ViewportSubscription>,
    placeholder: PlaceholderImage,
    mut cancel: oneshot::Receiver<()>,
) {
    // Held for the whole wait; dropping it would end the subscription early.
    let SlotRequest {
        source_url,
        region: _region,
        ..
    } = request;

    if let Some(subscription) = visibility {
        tokio::select! {
            biased;
            _ = &mut cancel => {
                trace!(url = %source_url, "Slot released before becoming visible");
                return;
            }
            () = subscription.wait() => {}
        }

        if !shared.publish(generation, RenderState::loading(placeholder)) {
            return;
        }
    }

    if !shared.is_current(generation) {
        return;
    }

    let next = match loader.resolve(&source_url).await {
        Ok(resolved) => {
            debug!(url = %source_url, origin = %resolved.origin, "Slot resolved");
            RenderState::resolved(resolved.payload)
        }
        Err(e) => {
            warn!(url = %source_url, error = %e, "Slot failed, showing fallback");
            RenderState::failed()
        }
    };

    shared.publish(generation, next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytes::Bytes;
    use chrono::{TimeDelta, Utc};
    use tokio::sync::Semaphore;

    use crate::application::services::{LoaderConfig, ViewportTracker};
    use crate::domain::entities::{
        CACHE_FORMAT_VERSION, CacheEntry, FALLBACK_ASSET, Rect, RenderContent, SlotPhase,
    };
    use crate::domain::ports::mocks::MockMediaFetcher;
    use crate::infrastructure::cache::MemoryMediaCache;

    fn screen() -> Rect {
        Rect::new(0.0, 0.0, 400.0, 800.0)
    }

    fn far_region() -> RegionHandle {
        RegionHandle::with_bounds(Rect::new(0.0, 5000.0, 400.0, 300.0))
    }

    struct Harness {
        loader: MediaLoader,
        cache: Arc<MemoryMediaCache>,
        fetcher: Arc<MockMediaFetcher>,
    }

    impl Harness {
        fn new(fetcher: MockMediaFetcher) -> Self {
            let cache = Arc::new(MemoryMediaCache::default());
            let fetcher = Arc::new(fetcher);
            let loader = MediaLoader::new(
                cache.clone(),
                fetcher.clone(),
                ViewportTracker::new(screen()),
                LoaderConfig::default(),
            );
            Self {
                loader,
                cache,
                fetcher,
            }
        }

        fn scroll_to(&self, y: f64) {
            self.loader
                .viewport()
                .set_viewport(Rect::new(0.0, y, 400.0, 800.0));
        }
    }

    async fn next_state(events: &mut mpsc::UnboundedReceiver<RenderState>) -> RenderState {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for render state")
            .expect("slot event stream closed")
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn test_priority_slot_fetches_immediately_and_caches() {
        let harness = Harness::new(MockMediaFetcher::new());
        let before = Utc::now();

        let request = SlotRequest::lazy("img/a.png", far_region()).with_priority(true);
        let (_slot, mut events) = harness.loader.mount(request);

        let first = next_state(&mut events).await;
        assert_eq!(first.phase, SlotPhase::Loading);
        assert!(first.is_loading);
        assert!(matches!(first.content, RenderContent::Placeholder(_)));

        let second = next_state(&mut events).await;
        assert_eq!(second.phase, SlotPhase::Resolved);
        assert!(!second.is_loading);
        assert!(!second.has_error);
        assert_eq!(
            second.content,
            RenderContent::Image(MockMediaFetcher::body_for("img/a.png"))
        );

        assert_eq!(harness.fetcher.calls_for("img/a.png"), 1);
        let entry = harness.cache.peek("img/a.png").await.unwrap();
        assert_eq!(entry.payload, MockMediaFetcher::body_for("img/a.png"));
        assert_eq!(entry.format_version, CACHE_FORMAT_VERSION);
        assert!(entry.captured_at >= before);
    }

    #[tokio::test]
    async fn test_fresh_cache_entry_resolves_without_fetch() {
        let harness = Harness::new(MockMediaFetcher::new());
        let entry = CacheEntry::with_captured_at(
            Bytes::from_static(b"cached-bytes"),
            Utc::now() - TimeDelta::days(3),
        );
        harness.cache.insert_entry("img/cached.png", entry).await;

        let (_slot, mut events) = harness.loader.mount(SlotRequest::priority("img/cached.png"));

        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        let resolved = next_state(&mut events).await;
        assert_eq!(
            resolved.content,
            RenderContent::Image(Bytes::from_static(b"cached-bytes"))
        );
        assert_eq!(harness.fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched_and_overwritten() {
        let harness = Harness::new(MockMediaFetcher::new());
        let stale = CacheEntry::with_captured_at(
            Bytes::from_static(b"stale-bytes"),
            Utc::now() - TimeDelta::days(8),
        );
        harness.cache.insert_entry("img/b.png", stale).await;
        let before = Utc::now();

        let (_slot, mut events) = harness.loader.mount(SlotRequest::priority("img/b.png"));

        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        let resolved = next_state(&mut events).await;
        assert_eq!(
            resolved.content,
            RenderContent::Image(MockMediaFetcher::body_for("img/b.png"))
        );
        assert_eq!(harness.fetcher.calls_for("img/b.png"), 1);

        let entry = harness.cache.peek("img/b.png").await.unwrap();
        assert_eq!(entry.payload, MockMediaFetcher::body_for("img/b.png"));
        assert!(entry.captured_at >= before);
    }

    #[tokio::test]
    async fn test_failed_fetch_shows_fallback_and_skips_cache() {
        let harness = Harness::new(MockMediaFetcher::new().failing_on("img/c.png"));

        let (slot, mut events) = harness.loader.mount(SlotRequest::priority("img/c.png"));

        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        let failed = next_state(&mut events).await;
        assert_eq!(failed.phase, SlotPhase::Failed);
        assert!(failed.has_error);
        assert!(!failed.is_loading);
        assert_eq!(failed.content, RenderContent::Fallback(FALLBACK_ASSET));

        assert!(harness.cache.peek("img/c.png").await.is_none());
        assert_eq!(slot.render_state(), failed);

        settle().await;
        assert!(events.try_recv().is_err());
        assert_eq!(harness.fetcher.calls_for("img/c.png"), 1);
    }

    #[tokio::test]
    async fn test_lazy_slot_waits_for_visibility() {
        let harness = Harness::new(MockMediaFetcher::new());

        let (slot, mut events) = harness
            .loader
            .mount(SlotRequest::lazy("img/lazy.png", far_region()));

        let first = next_state(&mut events).await;
        assert_eq!(first.phase, SlotPhase::Placeholder);
        assert!(first.is_loading);

        settle().await;
        assert_eq!(harness.fetcher.total_calls(), 0);
        assert_eq!(slot.render_state().phase, SlotPhase::Placeholder);

        harness.scroll_to(4500.0);

        let second = next_state(&mut events).await;
        assert_eq!(second.phase, SlotPhase::Loading);
        assert!(matches!(second.content, RenderContent::Placeholder(_)));

        let third = next_state(&mut events).await;
        assert_eq!(third.phase, SlotPhase::Resolved);
        assert_eq!(harness.fetcher.calls_for("img/lazy.png"), 1);
    }

    #[tokio::test]
    async fn test_lazy_slot_without_layout_fails_open() {
        let harness = Harness::new(MockMediaFetcher::new());

        let (_slot, mut events) = harness
            .loader
            .mount(SlotRequest::lazy("img/unmounted.png", RegionHandle::new()));

        let phases = [
            next_state(&mut events).await.phase,
            next_state(&mut events).await.phase,
            next_state(&mut events).await.phase,
        ];
        assert_eq!(
            phases,
            [SlotPhase::Placeholder, SlotPhase::Loading, SlotPhase::Resolved]
        );
    }

    #[tokio::test]
    async fn test_dropped_lazy_slot_never_fetches() {
        let harness = Harness::new(MockMediaFetcher::new());

        let (slot, mut events) = harness
            .loader
            .mount(SlotRequest::lazy("img/e.png", far_region()));
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Placeholder);

        drop(slot);
        harness.scroll_to(4500.0);
        settle().await;

        assert_eq!(harness.fetcher.total_calls(), 0);
        let closed = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("event stream not closed after drop");
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn test_disposed_slot_discards_in_flight_result() {
        let gate = Arc::new(Semaphore::new(0));
        let harness = Harness::new(MockMediaFetcher::new().gated(gate.clone()));

        let (slot, mut events) = harness.loader.mount(SlotRequest::priority("img/d.png"));
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        harness.fetcher.wait_for_calls(1).await;

        slot.dispose();
        gate.add_permits(1);

        let closed = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("event stream not closed after dispose");
        assert!(closed.is_none());
        assert!(harness.cache.peek("img/d.png").await.is_some());
    }

    #[tokio::test]
    async fn test_superseded_result_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let harness = Harness::new(MockMediaFetcher::new().gated(gate.clone()));

        let (mut slot, mut events) = harness.loader.mount(SlotRequest::priority("img/old.png"));
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        harness.fetcher.wait_for_calls(1).await;

        assert!(slot.set_source(SlotRequest::priority("img/new.png")));
        assert_eq!(slot.source_url(), "img/new.png");
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        harness.fetcher.wait_for_calls(2).await;

        gate.add_permits(1);
        tokio::time::timeout(Duration::from_secs(1), async {
            while harness.cache.peek("img/old.png").await.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("old fetch never completed");
        settle().await;
        assert_eq!(slot.render_state().phase, SlotPhase::Loading);
        assert!(events.try_recv().is_err());

        gate.add_permits(1);
        let resolved = next_state(&mut events).await;
        assert_eq!(
            resolved.content,
            RenderContent::Image(MockMediaFetcher::body_for("img/new.png"))
        );
    }

    #[tokio::test]
    async fn test_set_source_with_same_url_is_noop() {
        let harness = Harness::new(MockMediaFetcher::new());

        let (mut slot, mut events) = harness.loader.mount(SlotRequest::priority("img/a.png"));
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Resolved);

        assert!(!slot.set_source(SlotRequest::priority("img/a.png")));
        settle().await;
        assert!(events.try_recv().is_err());
        assert_eq!(harness.fetcher.calls_for("img/a.png"), 1);
    }

    #[tokio::test]
    async fn test_set_source_ignores_priority_change_for_same_url() {
        let harness = Harness::new(MockMediaFetcher::new());

        let (mut slot, mut events) = harness
            .loader
            .mount(SlotRequest::lazy("img/a.png", far_region()));
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Placeholder);

        assert!(!slot.set_source(SlotRequest::priority("img/a.png")));
        settle().await;
        assert!(!slot.is_priority());
        assert!(events.try_recv().is_err());
        assert_eq!(harness.fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_region_unmounted_after_mount_does_not_fetch() {
        let harness = Harness::new(MockMediaFetcher::new());
        let region = far_region();

        let (slot, mut events) = harness
            .loader
            .mount(SlotRequest::lazy("img/gone.png", region.clone()));
        region.unmount();

        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Placeholder);
        settle().await;
        assert_eq!(harness.fetcher.total_calls(), 0);
        assert_eq!(slot.render_state().phase, SlotPhase::Placeholder);
    }

    #[tokio::test]
    async fn test_reload_retries_after_failure() {
        let harness = Harness::new(MockMediaFetcher::new().failing_on("img/c.png"));

        let (mut slot, mut events) = harness.loader.mount(SlotRequest::priority("img/c.png"));
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Failed);

        slot.reload(RegionHandle::new());
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Loading);
        assert_eq!(next_state(&mut events).await.phase, SlotPhase::Failed);
        assert_eq!(harness.fetcher.calls_for("img/c.png"), 2);
    }

    #[tokio::test]
    async fn test_url_keys_are_case_sensitive() {
        let harness = Harness::new(MockMediaFetcher::new());
        harness
            .cache
            .insert_entry("img/A.png", CacheEntry::new(Bytes::from_static(b"upper")))
            .await;

        let (_slot, mut events) = harness.loader.mount(SlotRequest::priority("img/a.png"));
        next_state(&mut events).await;
        let resolved = next_state(&mut events).await;

        assert_eq!(
            resolved.content,
            RenderContent::Image(MockMediaFetcher::body_for("img/a.png"))
        );
        assert_eq!(harness.fetcher.calls_for("img/a.png"), 1);
    }
}
