//! # Scene Viewer
//!
//! Per-viewer interest manager. Decides which entities one remote viewer
//! should hear about, coalesces their changes and drains them to the
//! transport a budgeted batch at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SCENE VIEWER                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  scene events ──► enqueue paths ──► Coalescer (4 containers) │
//! │                        │                     │               │
//! │                    ViewSet ◄── scans      tick drain          │
//! │                        ▲          ▲          │               │
//! │                     Culler   WorkerPool      ▼               │
//! │                                          Transport           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - The first record a viewer receives for any identity is a full update.
//! - A root part is delivered no later than its children.
//! - Ticks never overlap; an overlapping call returns immediately.
//! - Public operations never fail; problems are logged and retried.

mod drain;
mod handler;
mod scan;
mod state;
mod view_set;

pub use drain::{SkipReason, TickReport};
pub use view_set::ViewSet;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use vista_core::{AnimationGroup, EntityId, PartSnapshot, PresenceSnapshot, UpdateFlags};

use self::handler::ViewerEventHandler;
use self::state::ViewerInner;
use crate::coalescer::PendingCounts;
use crate::config::InterestConfig;
use crate::debounce::Debouncer;
use crate::error::InterestResult;
use crate::integration::{SceneEvents, SubscriptionId, Transport, WorldQuery};
use crate::stats::ViewerStatsSnapshot;
use crate::update::PropertiesUpdate;
use crate::worker::WorkerPool;

/// Interest manager for one remote viewer.
///
/// Dropping the handle closes it.
pub struct SceneViewer {
    inner: Arc<ViewerInner>,
    events: Arc<dyn SceneEvents>,
    subscription: Mutex<Option<SubscriptionId>>,
    debouncer: Mutex<Option<Debouncer>>,
}

impl SceneViewer {
    /// Creates a viewer for the presence `viewer_id` and subscribes it to
    /// scene events.
    ///
    /// # Errors
    ///
    /// Fails if `config` is invalid or the debounce thread cannot start.
    pub fn new(
        viewer_id: EntityId,
        config: InterestConfig,
        world: Arc<dyn WorldQuery>,
        transport: Arc<dyn Transport>,
        events: Arc<dyn SceneEvents>,
        pool: Arc<WorkerPool>,
    ) -> InterestResult<Self> {
        config.validate()?;
        let delay = config.debounce();
        let inner = Arc::new(ViewerInner::new(viewer_id, config, world, transport, pool));

        let weak = Arc::downgrade(&inner);
        let debouncer = Debouncer::new(delay, move || {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!(viewer = %inner.viewer_id, "debounce window closed");
                if let Err(err) = inner.significant_movement() {
                    inner.report("debounced_recompute", &err);
                }
            }
        })?;
        // Fresh cell, cannot already be set.
        let _ = inner.recompute.set(debouncer.trigger());

        let handler = Arc::new(ViewerEventHandler { inner: Arc::downgrade(&inner) });
        let subscription = events.subscribe(handler);
        tracing::info!(viewer = %viewer_id, "scene viewer created");

        Ok(Self {
            inner,
            events,
            subscription: Mutex::new(Some(subscription)),
            debouncer: Mutex::new(Some(debouncer)),
        })
    }

    /// Presence this viewer belongs to.
    #[must_use]
    pub fn viewer_id(&self) -> EntityId {
        self.inner.viewer_id
    }

    /// A presence moved or changed. Out of view: forgotten. In view but
    /// unknown: queued as a full update. Known: queued as a delta.
    pub fn queue_presence_update(&self, presence: Arc<PresenceSnapshot>, flags: UpdateFlags) {
        if let Err(err) = self.inner.queue_presence_update(presence, flags) {
            self.inner.report("queue_presence_update", &err);
        }
    }

    /// Queues a full update for a presence. Unless `forced`, only if it is
    /// visible and not already known.
    pub fn queue_full_presence_update(&self, presence: Arc<PresenceSnapshot>, forced: bool) {
        if let Err(err) = self.inner.queue_full_presence_update(presence, forced) {
            self.inner.report("queue_full_presence_update", &err);
        }
    }

    /// Queues animation state for a visible presence, plus a terse update.
    pub fn queue_animation_update(&self, presence: Arc<PresenceSnapshot>, animations: AnimationGroup) {
        if let Err(err) = self.inner.queue_animation_update(presence, animations) {
            self.inner.report("queue_animation_update", &err);
        }
    }

    /// A part changed. Out of view: its group is forgotten. Group unknown:
    /// every part is queued as a full update, root first.
    pub fn queue_entity_update(&self, part: Arc<PartSnapshot>, flags: UpdateFlags) {
        if let Err(err) = self.inner.queue_entity_update(part, flags) {
            self.inner.report("queue_entity_update", &err);
        }
    }

    /// Queues property changes for parts whose group is visible.
    pub fn queue_properties_update(&self, updates: Vec<PropertiesUpdate>) {
        if let Err(err) = self.inner.queue_properties_update(updates) {
            self.inner.report("queue_properties_update", &err);
        }
    }

    /// Forgets a presence so its next in-view update is a full one.
    pub fn remove_from_view(&self, presence: EntityId) {
        self.inner.remove_from_view(presence);
    }

    /// Checks the viewer's travel since the last scan and schedules a
    /// recompute if it is significant.
    pub fn significant_movement(&self) {
        if let Err(err) = self.inner.significant_movement() {
            self.inner.report("significant_movement", &err);
        }
    }

    /// Schedules a debounced recompute, as a draw-distance or camera change
    /// does.
    pub fn request_recompute(&self) {
        self.inner.request_recompute();
    }

    /// Drains up to `presence_budget` presence/animation records and
    /// `prim_budget` property/part records to the transport.
    pub fn tick(&self, prim_budget: usize, presence_budget: usize) -> TickReport {
        self.inner.tick(prim_budget, presence_budget)
    }

    /// The viewer left for a neighbouring region: drop cached visibility and
    /// forget its own presence. Pending updates and known entities stay.
    pub fn reset(&self) {
        self.inner.culler.reset();
        self.inner.remove_from_view(self.inner.viewer_id);
        tracing::debug!(viewer = %self.inner.viewer_id, "scene viewer reset");
    }

    /// Unsubscribes, stops timers and drops all pending state. Idempotent.
    pub fn close(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(subscription) = self.subscription.lock().take() {
            self.events.unsubscribe(subscription);
        }
        if let Some(mut debouncer) = self.debouncer.lock().take() {
            debouncer.stop();
        }
        {
            let mut view = inner.view.lock();
            inner.queues.clear();
            view.clear();
        }
        inner.culler.reset();
        inner.sent_initial.store(false, Ordering::Release);
        *inner.last_update_pos.lock() = None;
        tracing::info!(viewer = %inner.viewer_id, "scene viewer closed");
    }

    /// True once [`SceneViewer::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// True if the viewer holds a baseline for `group`.
    #[must_use]
    pub fn is_group_in_view(&self, group: EntityId) -> bool {
        self.inner.view.lock().has_group(group)
    }

    /// True if the viewer holds a baseline for `presence`.
    #[must_use]
    pub fn is_presence_in_view(&self, presence: EntityId) -> bool {
        self.inner.view.lock().has_presence(presence)
    }

    /// Pending records per category.
    #[must_use]
    pub fn pending_counts(&self) -> PendingCounts {
        self.inner.queues.counts()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> ViewerStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl Drop for SceneViewer {
    fn drop(&mut self) {
        self.close();
    }
}
