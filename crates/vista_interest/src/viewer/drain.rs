//! # Tick Drain
//!
//! Moves pending records from the coalescer to the transport within two
//! independent per-tick budgets.
//!
//! ```text
//! presence budget ──► presences ──► leftover ──► animations
//! prim budget ──────► properties ─► leftover ──► part updates
//! ```
//!
//! Every drained record counts against its budget, including records dropped
//! because their entity no longer exists. Failed transport calls are logged
//! and counted; the records are not re-queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use vista_core::PresenceSnapshot;

use super::state::ViewerInner;
use crate::error::{InterestError, TransportResult};
use crate::stats::ViewerStats;
use crate::update::{EntityUpdate, UpdateTarget};

/// Why a tick did not drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The viewer is closed.
    Closed,
    /// Still inside the warm-up window.
    WarmingUp,
    /// Another tick is running.
    Busy,
    /// The viewer is crossing between regions.
    InTransit,
    /// The viewer's presence or region could not be read.
    ViewerUnavailable,
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Set when the tick returned without draining.
    pub skipped: Option<SkipReason>,
    /// Presence delta records sent.
    pub presence_updates: usize,
    /// Full presence updates sent.
    pub full_presence_updates: usize,
    /// Animation records sent.
    pub animations: usize,
    /// Property records sent.
    pub properties: usize,
    /// Part records sent.
    pub entity_updates: usize,
    /// Records dropped because their entity is gone.
    pub stale_dropped: usize,
    /// Transport calls that failed.
    pub transport_failures: usize,
}

impl TickReport {
    const fn skip(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            presence_updates: 0,
            full_presence_updates: 0,
            animations: 0,
            properties: 0,
            entity_updates: 0,
            stale_dropped: 0,
            transport_failures: 0,
        }
    }

    /// True when the tick returned without draining.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// Records delivered this tick.
    #[must_use]
    pub const fn sent(&self) -> usize {
        self.presence_updates
            + self.full_presence_updates
            + self.animations
            + self.properties
            + self.entity_updates
    }
}

/// Clears the non-reentrancy flag on every exit path.
struct InUseGuard<'a>(&'a AtomicBool);

impl Drop for InUseGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ViewerInner {
    pub(crate) fn tick(self: &Arc<Self>, prim_budget: usize, presence_budget: usize) -> TickReport {
        if self.closed.load(Ordering::Acquire) {
            ViewerStats::bump(&self.stats.skipped_other);
            return TickReport::skip(SkipReason::Closed);
        }
        let warmup = self.config.warmup_ticks;
        if let Ok(elapsed) = self
            .warmup_elapsed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < warmup).then_some(n + 1))
        {
            ViewerStats::bump(&self.stats.skipped_warmup);
            if elapsed + 1 == warmup {
                tracing::debug!(viewer = %self.viewer_id, ticks = warmup, "warm-up complete");
            }
            return TickReport::skip(SkipReason::WarmingUp);
        }
        if self
            .in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            ViewerStats::bump(&self.stats.skipped_busy);
            tracing::trace!(viewer = %self.viewer_id, "tick overlap, skipped");
            return TickReport::skip(SkipReason::Busy);
        }
        let _guard = InUseGuard(&self.in_use);
        let started = Instant::now();

        let viewer = match self.viewer_presence() {
            Ok(viewer) => viewer,
            Err(err) => {
                self.report("tick", &err);
                ViewerStats::bump(&self.stats.skipped_other);
                return TickReport::skip(SkipReason::ViewerUnavailable);
            }
        };
        if viewer.in_transit {
            ViewerStats::bump(&self.stats.skipped_other);
            return TickReport::skip(SkipReason::InTransit);
        }
        match self.world.region() {
            Ok(region) => self.maybe_start_initial_scan(&viewer, &region),
            Err(err) => {
                self.report("tick", &InterestError::from(err));
                ViewerStats::bump(&self.stats.skipped_other);
                return TickReport::skip(SkipReason::ViewerUnavailable);
            }
        }

        let report = self.drain(prim_budget, presence_budget);
        self.stats.record_tick(started.elapsed());
        if report.sent() > 0 {
            tracing::trace!(
                viewer = %self.viewer_id,
                sent = report.sent(),
                stale = report.stale_dropped,
                "tick drained"
            );
        }
        report
    }

    fn drain(&self, prim_budget: usize, presence_budget: usize) -> TickReport {
        let mut report = TickReport::default();

        // Presences, then animations with whatever budget is left.
        let batch = self.queues.presences.drain(presence_budget);
        let taken = batch.len();
        let mut deltas: Vec<EntityUpdate> = Vec::with_capacity(taken);
        for update in batch {
            if !self.world.contains(update.id) {
                report.stale_dropped += 1;
                continue;
            }
            if update.is_full() {
                if let UpdateTarget::Presence(presence) = &update.target {
                    self.send_full_presence(presence, &mut report);
                    continue;
                }
            }
            deltas.push(update);
        }
        if !deltas.is_empty() {
            let sent = self.transport.send_delta_batch(&deltas);
            if self.deliver("presence_deltas", sent, &mut report) {
                report.presence_updates += deltas.len();
            }
        }

        let leftover = presence_budget.saturating_sub(taken);
        for animations in self.queues.animations.drain(leftover) {
            if !self.world.contains(animations.presence) {
                report.stale_dropped += 1;
                continue;
            }
            if self.deliver("animations", self.transport.send_animations(&animations), &mut report) {
                report.animations += 1;
            }
        }

        // Properties, then part updates with whatever budget is left.
        let properties = self.queues.properties.drain(prim_budget);
        let taken = properties.len();
        let live: Vec<_> = properties
            .into_iter()
            .filter(|p| self.world.contains(p.part.id))
            .collect();
        report.stale_dropped += taken - live.len();
        if !live.is_empty() {
            let sent = self.transport.send_properties(&live);
            if self.deliver("properties", sent, &mut report) {
                report.properties += live.len();
            }
        }

        let leftover = prim_budget.saturating_sub(taken);
        let entities = self.queues.entities.drain(leftover);
        let drained = entities.len();
        let live: Vec<_> = entities.into_iter().filter(|u| self.world.contains(u.id)).collect();
        report.stale_dropped += drained - live.len();
        if !live.is_empty() {
            let sent = self.transport.send_delta_batch(&live);
            if self.deliver("entity_updates", sent, &mut report) {
                report.entity_updates += live.len();
            }
        }

        self.record(&report);
        report
    }

    /// Sends a presence's complete state, then queues baselines for what
    /// it is wearing.
    fn send_full_presence(&self, presence: &Arc<PresenceSnapshot>, report: &mut TickReport) {
        if self.deliver("full_presence", self.transport.send_full_update(presence), report) {
            report.full_presence_updates += 1;
        }
        match self.world.attachments(presence.id) {
            Ok(attachments) => {
                let Ok(mut view) = self.lock_view() else {
                    return;
                };
                for group in attachments.iter().filter(|g| !g.deleted) {
                    self.enqueue_baseline(&mut view, group);
                }
            }
            Err(err) => {
                tracing::warn!(
                    viewer = %self.viewer_id,
                    presence = %presence.id,
                    error = %err,
                    "attachments unavailable"
                );
            }
        }
    }

    fn deliver(
        &self,
        what: &'static str,
        result: TransportResult<()>,
        report: &mut TickReport,
    ) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                report.transport_failures += 1;
                tracing::warn!(viewer = %self.viewer_id, batch = what, error = %err, "transport failed");
                false
            }
        }
    }

    fn record(&self, report: &TickReport) {
        let stats = &self.stats;
        ViewerStats::add(&stats.presence_updates, report.presence_updates);
        ViewerStats::add(&stats.full_presence_updates, report.full_presence_updates);
        ViewerStats::add(&stats.animations, report.animations);
        ViewerStats::add(&stats.properties, report.properties);
        ViewerStats::add(&stats.entity_updates, report.entity_updates);
        ViewerStats::add(&stats.stale_dropped, report.stale_dropped);
        ViewerStats::add(&stats.transport_failures, report.transport_failures);
    }
}
