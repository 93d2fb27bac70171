//! # Visibility Scans
//!
//! Region-wide walks that find everything visible but not yet known to the
//! viewer and queue baselines for it, most relevant first.
//!
//! ```text
//! first drain after warm-up ──► initial scan ─┐
//! significant movement ───────► recompute ────┼──► worker pool ──► full_scan
//! debounced camera/draw dist ─► recompute ────┘
//! ```
//!
//! Scans are idempotent: anything already in the view set is skipped, so a
//! failed or repeated scan only ever adds what is missing.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use vista_core::{GroupSnapshot, PresenceSnapshot, RegionInfo, UpdateFlags};

use super::state::ViewerInner;
use crate::error::{InterestError, InterestResult};
use crate::stats::ViewerStats;
use crate::update::EntityUpdate;

/// Why a scan ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScanReason {
    Initial,
    Recompute,
}

impl ScanReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Recompute => "recompute",
        }
    }
}

/// What a scan added.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ScanSummary {
    pub(crate) groups: usize,
    pub(crate) parts: usize,
    pub(crate) presences: usize,
}

impl ViewerInner {
    /// Dispatches the initial scan once, if the viewer can see this region.
    pub(crate) fn maybe_start_initial_scan(
        self: &Arc<Self>,
        viewer: &PresenceSnapshot,
        region: &RegionInfo,
    ) {
        if self.sent_initial.load(Ordering::Acquire) || viewer.draw_distance <= 0.0 {
            return;
        }
        if viewer.is_child_agent && !region.see_into_from_neighbor {
            return;
        }
        if self
            .sent_initial
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if let Err(err) = self.dispatch_scan(ScanReason::Initial) {
            self.sent_initial.store(false, Ordering::Release);
            self.report("initial_scan", &err);
        }
    }

    /// Checks whether the viewer moved far enough to warrant a recompute
    /// and dispatches one if so.
    pub(crate) fn significant_movement(self: &Arc<Self>) -> InterestResult<()> {
        self.ensure_open()?;
        if !self.config.use_culling || !self.sent_initial.load(Ordering::Acquire) {
            return Ok(());
        }
        let viewer = self.viewer_presence()?;
        let region = self.world.region()?;
        let forced = self.force_cull_check.load(Ordering::Acquire);

        if !forced && self.culler.covers_region(&viewer, &region) {
            self.force_cull_check.store(false, Ordering::Release);
            return Ok(());
        }
        if viewer.draw_distance <= 0.0 {
            return Ok(());
        }
        if viewer.is_child_agent && !region.see_into_from_neighbor {
            return Ok(());
        }

        let origin = viewer.view_origin();
        let moved_sq = self
            .last_update_pos
            .lock()
            .map_or(f32::INFINITY, |last| origin.distance_squared(last));
        let score = moved_sq + self.config.velocity_weight * viewer.velocity.length_squared();
        if score < self.config.min_view_step_sq() && !forced {
            return Ok(());
        }
        self.force_cull_check.store(false, Ordering::Release);
        ViewerStats::bump(&self.stats.recomputes);
        if let Err(err) = self.dispatch_scan(ScanReason::Recompute) {
            self.force_cull_check.store(true, Ordering::Release);
            return Err(err);
        }
        Ok(())
    }

    fn dispatch_scan(self: &Arc<Self>, reason: ScanReason) -> InterestResult<()> {
        let inner = Arc::clone(self);
        self.pool.spawn(move || inner.run_scan(reason))?;
        ViewerStats::bump(&self.stats.scans_started);
        Ok(())
    }

    fn run_scan(&self, reason: ScanReason) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.full_scan()))
            .unwrap_or(Err(InterestError::ScanPanicked));
        match outcome {
            Ok(summary) => {
                ViewerStats::bump(&self.stats.scans_completed);
                tracing::debug!(
                    viewer = %self.viewer_id,
                    reason = reason.as_str(),
                    groups = summary.groups,
                    parts = summary.parts,
                    presences = summary.presences,
                    "scan complete"
                );
            }
            Err(err) => {
                match reason {
                    ScanReason::Initial => self.sent_initial.store(false, Ordering::Release),
                    ScanReason::Recompute => self.force_cull_check.store(true, Ordering::Release),
                }
                ViewerStats::bump(&self.stats.scans_failed);
                tracing::warn!(
                    viewer = %self.viewer_id,
                    reason = reason.as_str(),
                    error = %err,
                    "scan failed, will retry"
                );
            }
        }
    }

    /// Queues baselines for every visible group and presence the viewer does
    /// not know yet, then records the scan origin.
    pub(crate) fn full_scan(&self) -> InterestResult<ScanSummary> {
        self.ensure_open()?;
        let viewer = self.viewer_presence()?;
        let region = self.world.region()?;
        let groups = self.world.groups()?;
        let presences = self.world.presences()?;

        let visible: Vec<Arc<GroupSnapshot>> = groups
            .into_iter()
            .filter(|g| self.culler.visible_group(&viewer, &region, g))
            .collect();
        let visible_presences: Vec<Arc<PresenceSnapshot>> = presences
            .into_iter()
            .filter(|p| p.id != self.viewer_id)
            .filter(|p| self.culler.visible_presence(&viewer, &region, p))
            .collect();

        let mut summary = ScanSummary::default();
        {
            let mut view = self.lock_view()?;

            let fresh: Vec<Arc<GroupSnapshot>> =
                visible.into_iter().filter(|g| !view.has_group(g.id)).collect();
            for update in self.prioritizer.order_full_scan(&viewer, &fresh) {
                self.queues.entities.enqueue_back(update.id, update);
                summary.parts += 1;
            }
            for group in &fresh {
                view.insert_group(group.id);
            }
            summary.groups = fresh.len();

            let fresh_presences: Vec<Arc<PresenceSnapshot>> =
                visible_presences.into_iter().filter(|p| !view.has_presence(p.id)).collect();
            for presence in self.prioritizer.order_presences(&viewer, fresh_presences) {
                view.insert_presence(presence.id);
                self.queues
                    .presences
                    .enqueue(presence.id, EntityUpdate::presence(presence, UpdateFlags::forced_full()));
                summary.presences += 1;
            }
        }

        *self.last_update_pos.lock() = Some(viewer.view_origin());
        Ok(summary)
    }
}
