//! # Viewer State
//!
//! Shared state behind a [`SceneViewer`](super::SceneViewer) handle and the
//! enqueue paths that feed the coalescer.
//!
//! ## Lock order
//!
//! ```text
//! view ──► one coalescer container
//! ```
//!
//! The view lock is taken first and held while a baseline is enqueued and
//! membership is recorded, so a delta can never reach a container ahead of
//! the full update for the same identity. Container operations never take
//! the view lock.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, MutexGuard};
use vista_core::{
    AnimationGroup, EntityId, GroupSnapshot, PartSnapshot, PresenceSnapshot, UpdateFlags, Vec3,
};

use super::view_set::ViewSet;
use crate::coalescer::Coalescer;
use crate::config::InterestConfig;
use crate::culler::Culler;
use crate::debounce::DebounceTrigger;
use crate::error::{InterestError, InterestResult};
use crate::integration::{Transport, WorldQuery};
use crate::prioritizer::Prioritizer;
use crate::stats::ViewerStats;
use crate::update::{EntityUpdate, PropertiesUpdate};
use crate::worker::WorkerPool;

pub(crate) struct ViewerInner {
    pub(crate) viewer_id: EntityId,
    pub(crate) config: InterestConfig,
    pub(crate) world: Arc<dyn WorldQuery>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) pool: Arc<WorkerPool>,
    pub(crate) culler: Culler,
    pub(crate) prioritizer: Prioritizer,
    pub(crate) queues: Coalescer,
    pub(crate) view: Mutex<ViewSet>,
    /// View origin at the last completed scan.
    pub(crate) last_update_pos: Mutex<Option<Vec3>>,
    pub(crate) warmup_elapsed: AtomicU32,
    pub(crate) sent_initial: AtomicBool,
    pub(crate) in_use: AtomicBool,
    pub(crate) force_cull_check: AtomicBool,
    pub(crate) closed: AtomicBool,
    pub(crate) recompute: OnceLock<DebounceTrigger>,
    pub(crate) stats: ViewerStats,
}

impl ViewerInner {
    pub(crate) fn new(
        viewer_id: EntityId,
        config: InterestConfig,
        world: Arc<dyn WorldQuery>,
        transport: Arc<dyn Transport>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            viewer_id,
            culler: Culler::new(&config),
            prioritizer: Prioritizer::new(&config),
            config,
            world,
            transport,
            pool,
            queues: Coalescer::new(),
            view: Mutex::new(ViewSet::default()),
            last_update_pos: Mutex::new(None),
            warmup_elapsed: AtomicU32::new(0),
            sent_initial: AtomicBool::new(false),
            in_use: AtomicBool::new(false),
            force_cull_check: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            recompute: OnceLock::new(),
            stats: ViewerStats::default(),
        }
    }

    pub(crate) fn ensure_open(&self) -> InterestResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(InterestError::ViewerClosed);
        }
        Ok(())
    }

    /// Locks the view set, failing once the viewer is closed. Every
    /// enqueue happens under this guard so nothing lands after `close`.
    pub(crate) fn lock_view(&self) -> InterestResult<MutexGuard<'_, ViewSet>> {
        let view = self.view.lock();
        self.ensure_open()?;
        Ok(view)
    }

    /// The viewer's own presence, fresh from the world.
    pub(crate) fn viewer_presence(&self) -> InterestResult<Arc<PresenceSnapshot>> {
        self.world
            .presence(self.viewer_id)?
            .ok_or(InterestError::ViewerMissing(self.viewer_id))
    }

    /// Logs a failure from a public entry point. Nothing propagates.
    pub(crate) fn report(&self, operation: &'static str, err: &InterestError) {
        match err {
            InterestError::ViewerClosed => {
                tracing::trace!(viewer = %self.viewer_id, operation, "ignored, viewer closed");
            }
            InterestError::ViewerMissing(_) => {
                tracing::debug!(viewer = %self.viewer_id, operation, error = %err, "skipped");
            }
            _ => tracing::warn!(viewer = %self.viewer_id, operation, error = %err, "failed"),
        }
    }

    // ------------------------------------------------------------------------
    // Presences
    // ------------------------------------------------------------------------

    /// Presence is out of view: forget it so its next update in view is a
    /// full one. Returns true if it was visible.
    fn check_presence_visible(
        &self,
        viewer: &PresenceSnapshot,
        presence: &PresenceSnapshot,
    ) -> InterestResult<bool> {
        let region = self.world.region()?;
        if self.culler.visible_presence(viewer, &region, presence) {
            return Ok(true);
        }
        if self.view.lock().remove_presence(presence.id) {
            tracing::debug!(viewer = %self.viewer_id, presence = %presence.id, "presence left view");
        }
        Ok(false)
    }

    pub(crate) fn queue_presence_update(
        &self,
        presence: Arc<PresenceSnapshot>,
        flags: UpdateFlags,
    ) -> InterestResult<()> {
        self.ensure_open()?;
        let viewer = self.viewer_presence()?;
        if !self.check_presence_visible(&viewer, &presence)? {
            return Ok(());
        }
        let mut view = self.lock_view()?;
        self.queue_presence_in_view(&mut view, presence, flags);
        Ok(())
    }

    /// Visible presence: a delta if the viewer knows it, otherwise a full
    /// update and membership. Caller holds the view lock.
    fn queue_presence_in_view(
        &self,
        view: &mut ViewSet,
        presence: Arc<PresenceSnapshot>,
        flags: UpdateFlags,
    ) {
        let flags = if view.insert_presence(presence.id) {
            tracing::debug!(viewer = %self.viewer_id, presence = %presence.id, "presence entered view");
            UpdateFlags::forced_full()
        } else {
            flags
        };
        self.enqueue_presence(EntityUpdate::presence(presence, flags));
    }

    pub(crate) fn queue_full_presence_update(
        &self,
        presence: Arc<PresenceSnapshot>,
        forced: bool,
    ) -> InterestResult<()> {
        self.ensure_open()?;
        if !forced {
            let viewer = self.viewer_presence()?;
            if !self.check_presence_visible(&viewer, &presence)? {
                return Ok(());
            }
        }
        let mut view = self.lock_view()?;
        if !view.insert_presence(presence.id) && !forced {
            return Ok(());
        }
        self.enqueue_presence(EntityUpdate::presence(presence, UpdateFlags::forced_full()));
        Ok(())
    }

    pub(crate) fn queue_animation_update(
        &self,
        presence: Arc<PresenceSnapshot>,
        animations: AnimationGroup,
    ) -> InterestResult<()> {
        self.ensure_open()?;
        let viewer = self.viewer_presence()?;
        if !self.check_presence_visible(&viewer, &presence)? {
            return Ok(());
        }
        let id = presence.id;
        let mut view = self.lock_view()?;
        self.queue_presence_in_view(&mut view, presence, UpdateFlags::TERSE);
        self.queues.animations.enqueue(id, animations);
        Ok(())
    }

    pub(crate) fn remove_from_view(&self, presence: EntityId) {
        self.view.lock().remove_presence(presence);
    }

    /// The viewer's own presence jumps the queue.
    fn enqueue_presence(&self, update: EntityUpdate) {
        if update.id == self.viewer_id {
            self.queues.presences.enqueue_front(update.id, update);
        } else {
            self.queues.presences.enqueue(update.id, update);
        }
    }

    // ------------------------------------------------------------------------
    // Parts
    // ------------------------------------------------------------------------

    pub(crate) fn queue_entity_update(
        &self,
        part: Arc<PartSnapshot>,
        flags: UpdateFlags,
    ) -> InterestResult<()> {
        self.ensure_open()?;
        let Some(group) = self.world.group(part.group)? else {
            return Ok(());
        };
        let viewer = self.viewer_presence()?;
        let region = self.world.region()?;

        let mut view = self.lock_view()?;
        if !self.culler.visible_group(&viewer, &region, &group) {
            if view.remove_group(group.id) {
                tracing::debug!(viewer = %self.viewer_id, group = %group.id, "group left view");
            }
            return Ok(());
        }
        if view.has_group(group.id) {
            self.queues.entities.enqueue(part.id, EntityUpdate::part(part, flags));
        } else {
            self.enqueue_baseline(&mut view, &group);
        }
        Ok(())
    }

    /// Queues a full update for every part of `group`, root first, and
    /// marks it known. Caller holds the view lock.
    pub(crate) fn enqueue_baseline(&self, view: &mut ViewSet, group: &GroupSnapshot) {
        for update in EntityUpdate::baseline_for(group) {
            self.queues.entities.enqueue_back(update.id, update);
        }
        view.insert_group(group.id);
    }

    pub(crate) fn queue_properties_update(
        &self,
        updates: Vec<PropertiesUpdate>,
    ) -> InterestResult<()> {
        self.ensure_open()?;
        let viewer = self.viewer_presence()?;
        let region = self.world.region()?;
        let mut visible = Vec::with_capacity(updates.len());
        for update in updates {
            let Some(group) = self.world.group(update.part.group)? else {
                continue;
            };
            if self.culler.visible_group(&viewer, &region, &group) {
                visible.push(update);
            }
        }
        let _view = self.lock_view()?;
        for update in visible {
            self.queues.properties.enqueue(update.part.id, update);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Recompute triggers
    // ------------------------------------------------------------------------

    /// Forces the next significant-movement check through and starts the
    /// debounce window.
    pub(crate) fn request_recompute(&self) {
        if !self.config.use_culling {
            return;
        }
        self.force_cull_check.store(true, Ordering::Release);
        if let Some(trigger) = self.recompute.get() {
            trigger.arm();
        }
    }
}
