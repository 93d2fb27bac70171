//! # Update Coalescer
//!
//! Four independently locked pending containers, one per update category.
//! Each container holds at most one record per identity; a second
//! notification for the same identity merges into the first.
//!
//! ```text
//!  scene threads                         tick thread
//!  ─────────────                         ───────────
//!  enqueue(id, v) ──► ┌──────────────────┐
//!                     │ Mutex<IndexMap>  │ ──► drain(budget) ──► transport
//!  enqueue(id, v) ──► │ id → record      │
//!                     └──────────────────┘
//! ```
//!
//! ## Position policy
//!
//! - [`Requeue::InPlace`]: a merged record keeps its queue position.
//! - [`Requeue::ToTail`]: a merged record moves to the tail.
//!
//! [`PendingQueue::enqueue_back`] moves to the tail regardless of policy.
//!
//! ## Locking
//!
//! Every operation takes exactly one container lock and releases it before
//! returning. No caller may hold two container locks at once.

use std::hash::Hash;

use indexmap::IndexMap;
use parking_lot::Mutex;
use vista_core::{AnimationGroup, EntityId};

use crate::update::{Coalesce, EntityUpdate, PropertiesUpdate};

/// Where a merged record ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requeue {
    /// Keep the original position.
    InPlace,
    /// Move to the tail.
    ToTail,
}

/// Outcome of an enqueue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enqueued {
    /// A new record was inserted.
    Inserted,
    /// The value merged into an existing record.
    Merged,
}

/// Insertion-ordered map of pending records with merge-on-enqueue.
#[derive(Debug)]
pub struct PendingQueue<K, V> {
    entries: Mutex<IndexMap<K, V>>,
    requeue: Requeue,
}

impl<K, V> PendingQueue<K, V>
where
    K: Hash + Eq + Copy,
    V: Coalesce,
{
    /// Creates an empty queue with the given merge position policy.
    #[must_use]
    pub fn new(requeue: Requeue) -> Self {
        Self { entries: Mutex::new(IndexMap::new()), requeue }
    }

    /// Inserts at the tail, or merges into the pending record for `key`.
    pub fn enqueue(&self, key: K, value: V) -> Enqueued {
        self.enqueue_with(key, value, Coalesce::merge)
    }

    /// Inserts at the head, or merges in place into the pending record for
    /// `key`. Used for the viewer's own presence.
    pub fn enqueue_front(&self, key: K, value: V) -> Enqueued {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get_mut(&key) {
            existing.merge(value);
            return Enqueued::Merged;
        }
        entries.shift_insert(0, key, value);
        Enqueued::Inserted
    }

    /// Merges into the pending record for `key` and moves it to the tail,
    /// whatever the queue's policy. A baseline enqueued part by part keeps
    /// its own order even when some parts already had stale records ahead.
    pub fn enqueue_back(&self, key: K, value: V) -> Enqueued {
        let mut entries = self.entries.lock();
        Self::merge_to_tail(&mut entries, key, value, Coalesce::merge)
    }

    /// Like [`PendingQueue::enqueue`] with a caller-supplied merge.
    pub fn enqueue_with<F>(&self, key: K, value: V, merge: F) -> Enqueued
    where
        F: FnOnce(&mut V, V),
    {
        let mut entries = self.entries.lock();
        match self.requeue {
            Requeue::InPlace => {
                if let Some(existing) = entries.get_mut(&key) {
                    merge(existing, value);
                    return Enqueued::Merged;
                }
                entries.insert(key, value);
                Enqueued::Inserted
            }
            Requeue::ToTail => Self::merge_to_tail(&mut entries, key, value, merge),
        }
    }

    fn merge_to_tail<F>(entries: &mut IndexMap<K, V>, key: K, value: V, merge: F) -> Enqueued
    where
        F: FnOnce(&mut V, V),
    {
        match entries.shift_remove(&key) {
            Some(mut existing) => {
                merge(&mut existing, value);
                entries.insert(key, existing);
                Enqueued::Merged
            }
            None => {
                entries.insert(key, value);
                Enqueued::Inserted
            }
        }
    }

    /// Removes and returns up to `max` records from the head, in order.
    pub fn drain(&self, max: usize) -> Vec<V> {
        if max == 0 {
            return Vec::new();
        }
        let mut entries = self.entries.lock();
        let count = max.min(entries.len());
        entries.drain(..count).map(|(_, v)| v).collect()
    }

    /// Pending record count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// True when a record for `key` is pending.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Drops every pending record.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Pending record counts per category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingCounts {
    /// Presence movement/appearance records.
    pub presences: usize,
    /// Animation records.
    pub animations: usize,
    /// Property records.
    pub properties: usize,
    /// Part movement/appearance records.
    pub entities: usize,
}

impl PendingCounts {
    /// Sum over all categories.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.presences + self.animations + self.properties + self.entities
    }
}

/// The four pending containers of one viewer.
#[derive(Debug)]
pub struct Coalescer {
    /// Presence updates; the viewer's own presence goes to the head.
    pub presences: PendingQueue<EntityId, EntityUpdate>,
    /// Animation state per presence.
    pub animations: PendingQueue<EntityId, AnimationGroup>,
    /// Property changes; a merged record moves to the tail.
    pub properties: PendingQueue<EntityId, PropertiesUpdate>,
    /// Part updates.
    pub entities: PendingQueue<EntityId, EntityUpdate>,
}

impl Coalescer {
    /// Creates four empty containers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            presences: PendingQueue::new(Requeue::InPlace),
            animations: PendingQueue::new(Requeue::InPlace),
            properties: PendingQueue::new(Requeue::ToTail),
            entities: PendingQueue::new(Requeue::InPlace),
        }
    }

    /// Snapshot of pending counts. Each count is read under its own lock.
    #[must_use]
    pub fn counts(&self) -> PendingCounts {
        PendingCounts {
            presences: self.presences.len(),
            animations: self.animations.len(),
            properties: self.properties.len(),
            entities: self.entities.len(),
        }
    }

    /// Empties all four containers.
    pub fn clear(&self) {
        self.presences.clear();
        self.animations.clear();
        self.properties.clear();
        self.entities.clear();
    }
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vista_core::{PartSnapshot, PropertyFlags, UpdateFlags, Vec3};

    fn part(id: u64) -> Arc<PartSnapshot> {
        Arc::new(PartSnapshot::root(EntityId(id), EntityId(id + 1000), Vec3::ZERO))
    }

    fn ids(updates: &[EntityUpdate]) -> Vec<u64> {
        updates.iter().map(|u| u.id.0).collect()
    }

    #[test]
    fn test_merge_in_place_keeps_position() {
        let q = PendingQueue::new(Requeue::InPlace);
        q.enqueue(EntityId(1), EntityUpdate::part(part(1), UpdateFlags::POSITION));
        q.enqueue(EntityId(2), EntityUpdate::part(part(2), UpdateFlags::POSITION));
        let outcome = q.enqueue(EntityId(1), EntityUpdate::part(part(1), UpdateFlags::SHAPE));

        assert_eq!(outcome, Enqueued::Merged);
        assert_eq!(q.len(), 2);
        let drained = q.drain(10);
        assert_eq!(ids(&drained), vec![1, 2]);
        assert_eq!(drained[0].flags, UpdateFlags::POSITION | UpdateFlags::SHAPE);
    }

    #[test]
    fn test_properties_move_to_tail_on_merge() {
        let c = Coalescer::new();
        c.properties.enqueue(EntityId(1), PropertiesUpdate::new(part(1), PropertyFlags::NAME));
        c.properties.enqueue(EntityId(2), PropertiesUpdate::new(part(2), PropertyFlags::NAME));
        c.properties.enqueue(EntityId(1), PropertiesUpdate::new(part(1), PropertyFlags::OWNER));

        let drained = c.properties.drain(10);
        let order: Vec<_> = drained.iter().map(|p| p.part.id.0).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(drained[1].fields, PropertyFlags::NAME | PropertyFlags::OWNER);
    }

    #[test]
    fn test_enqueue_front() {
        let q = PendingQueue::new(Requeue::InPlace);
        q.enqueue(EntityId(1), EntityUpdate::part(part(1), UpdateFlags::POSITION));
        q.enqueue(EntityId(2), EntityUpdate::part(part(2), UpdateFlags::POSITION));
        q.enqueue_front(EntityId(9), EntityUpdate::part(part(9), UpdateFlags::POSITION));
        // Already pending: merge, no move.
        q.enqueue_front(EntityId(2), EntityUpdate::part(part(2), UpdateFlags::VELOCITY));

        assert_eq!(ids(&q.drain(10)), vec![9, 1, 2]);
    }

    #[test]
    fn test_enqueue_back_moves_stale_record_behind_new_ones() {
        let q = PendingQueue::new(Requeue::InPlace);
        // Stale child delta already waiting at the head.
        q.enqueue(EntityId(2), EntityUpdate::part(part(2), UpdateFlags::POSITION));
        q.enqueue(EntityId(7), EntityUpdate::part(part(7), UpdateFlags::POSITION));
        let full = |id| EntityUpdate::part(part(id), UpdateFlags::forced_full());
        assert_eq!(q.enqueue_back(EntityId(1), full(1)), Enqueued::Inserted);
        assert_eq!(q.enqueue_back(EntityId(2), full(2)), Enqueued::Merged);

        let drained = q.drain(10);
        assert_eq!(ids(&drained), vec![7, 1, 2]);
        assert!(drained[2].is_full());
        assert!(drained[2].flags.contains(UpdateFlags::POSITION));
    }

    #[test]
    fn test_drain_respects_budget() {
        let q = PendingQueue::new(Requeue::InPlace);
        for i in 0..10 {
            q.enqueue(EntityId(i), EntityUpdate::part(part(i), UpdateFlags::POSITION));
        }
        assert!(q.drain(0).is_empty());
        assert_eq!(ids(&q.drain(4)), vec![0, 1, 2, 3]);
        assert_eq!(q.len(), 6);
        assert_eq!(q.drain(100).len(), 6);
        assert!(q.is_empty());
    }

    #[test]
    fn test_full_survives_later_delta() {
        let q = PendingQueue::new(Requeue::InPlace);
        q.enqueue(EntityId(1), EntityUpdate::part(part(1), UpdateFlags::forced_full()));
        q.enqueue(EntityId(1), EntityUpdate::part(part(1), UpdateFlags::POSITION));
        assert!(q.drain(1)[0].is_full());
    }

    #[test]
    fn test_counts_and_clear() {
        let c = Coalescer::new();
        c.entities.enqueue(EntityId(1), EntityUpdate::part(part(1), UpdateFlags::POSITION));
        c.animations.enqueue(EntityId(5), AnimationGroup::new(EntityId(5), Vec::new()));
        assert_eq!(c.counts().total(), 2);
        assert!(c.entities.contains(&EntityId(1)));
        c.clear();
        assert_eq!(c.counts(), PendingCounts::default());
    }
}
