//! # Viewer Statistics
//!
//! Lock-free counters updated from the tick thread, background scans and
//! scene event handlers. [`ViewerStats::snapshot`] reads them into a plain
//! struct for logging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for one viewer.
#[derive(Debug, Default)]
pub struct ViewerStats {
    /// Ticks that drained.
    pub ticks: AtomicU64,
    /// Ticks skipped during warm-up.
    pub skipped_warmup: AtomicU64,
    /// Ticks skipped because another tick was running.
    pub skipped_busy: AtomicU64,
    /// Ticks skipped for any other reason.
    pub skipped_other: AtomicU64,
    /// Full scans dispatched (initial and recompute).
    pub scans_started: AtomicU64,
    /// Full scans that finished.
    pub scans_completed: AtomicU64,
    /// Full scans that failed.
    pub scans_failed: AtomicU64,
    /// Recomputes triggered by movement or debounced changes.
    pub recomputes: AtomicU64,
    /// Presence delta records sent.
    pub presence_updates: AtomicU64,
    /// Full presence updates sent.
    pub full_presence_updates: AtomicU64,
    /// Animation records sent.
    pub animations: AtomicU64,
    /// Property records sent.
    pub properties: AtomicU64,
    /// Part records sent.
    pub entity_updates: AtomicU64,
    /// Records dropped because their entity no longer exists.
    pub stale_dropped: AtomicU64,
    /// Transport calls that failed.
    pub transport_failures: AtomicU64,
    /// Duration of the last drained tick in microseconds.
    pub last_tick_us: AtomicU64,
    /// Longest drained tick in microseconds.
    pub max_tick_us: AtomicU64,
    /// Rolling average tick duration in microseconds.
    pub avg_tick_us: AtomicU64,
}

impl ViewerStats {
    /// Bumps a counter by one.
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `n` to a counter.
    #[inline]
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Records a drained tick's duration.
    pub fn record_tick(&self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        Self::bump(&self.ticks);
        self.last_tick_us.store(us, Ordering::Relaxed);
        self.max_tick_us.fetch_max(us, Ordering::Relaxed);
        // 7/8 old + 1/8 new.
        let avg = self.avg_tick_us.load(Ordering::Relaxed);
        let next = if avg == 0 { us } else { (avg * 7 + us) / 8 };
        self.avg_tick_us.store(next, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> ViewerStatsSnapshot {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ViewerStatsSnapshot {
            ticks: read(&self.ticks),
            skipped_warmup: read(&self.skipped_warmup),
            skipped_busy: read(&self.skipped_busy),
            skipped_other: read(&self.skipped_other),
            scans_started: read(&self.scans_started),
            scans_completed: read(&self.scans_completed),
            scans_failed: read(&self.scans_failed),
            recomputes: read(&self.recomputes),
            presence_updates: read(&self.presence_updates),
            full_presence_updates: read(&self.full_presence_updates),
            animations: read(&self.animations),
            properties: read(&self.properties),
            entity_updates: read(&self.entity_updates),
            stale_dropped: read(&self.stale_dropped),
            transport_failures: read(&self.transport_failures),
            last_tick_us: read(&self.last_tick_us),
            max_tick_us: read(&self.max_tick_us),
            avg_tick_us: read(&self.avg_tick_us),
        }
    }
}

/// Plain copy of [`ViewerStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ViewerStatsSnapshot {
    pub ticks: u64,
    pub skipped_warmup: u64,
    pub skipped_busy: u64,
    pub skipped_other: u64,
    pub scans_started: u64,
    pub scans_completed: u64,
    pub scans_failed: u64,
    pub recomputes: u64,
    pub presence_updates: u64,
    pub full_presence_updates: u64,
    pub animations: u64,
    pub properties: u64,
    pub entity_updates: u64,
    pub stale_dropped: u64,
    pub transport_failures: u64,
    pub last_tick_us: u64,
    pub max_tick_us: u64,
    pub avg_tick_us: u64,
}

impl ViewerStatsSnapshot {
    /// Records of any kind delivered to the transport.
    #[must_use]
    pub const fn records_sent(&self) -> u64 {
        self.presence_updates
            + self.full_presence_updates
            + self.animations
            + self.properties
            + self.entity_updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tick() {
        let stats = ViewerStats::default();
        stats.record_tick(Duration::from_micros(800));
        stats.record_tick(Duration::from_micros(0));
        let snap = stats.snapshot();
        assert_eq!(snap.ticks, 2);
        assert_eq!(snap.max_tick_us, 800);
        assert_eq!(snap.last_tick_us, 0);
        assert_eq!(snap.avg_tick_us, 700);
    }

    #[test]
    fn test_records_sent() {
        let stats = ViewerStats::default();
        ViewerStats::add(&stats.entity_updates, 3);
        ViewerStats::bump(&stats.full_presence_updates);
        assert_eq!(stats.snapshot().records_sent(), 4);
    }
}
