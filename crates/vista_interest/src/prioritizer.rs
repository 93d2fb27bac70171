//! # Relevance Ranker
//!
//! Scores entities for a viewer. Smaller priority means sooner; scores are
//! only comparable within one viewer at one instant.
//!
//! A group's root part is always scored strictly ahead of its children so a
//! receiver never sees a child before the root it hangs off.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use vista_core::{GroupSnapshot, PartSnapshot, PresenceSnapshot, UpdateFlags, Vec3};

use crate::config::{InterestConfig, PrioritizationScheme};
use crate::update::EntityUpdate;

/// Multiplier applied to entities behind the camera.
const BEHIND_PENALTY: f64 = 2.0;

/// Scale applied to presences and own attachments under
/// [`PrioritizationScheme::BestAvatarResponsiveness`].
const AVATAR_SCALE: f64 = 0.01;

/// A scored update, ordered so that [`BinaryHeap`] pops the smallest
/// priority first. Ties go to the earlier `seq`.
#[derive(Debug)]
pub struct PriorityQueueItem {
    /// Score; smaller is sooner.
    pub priority: f64,
    /// Insertion order for tie-breaking.
    pub seq: u64,
    /// The baseline record.
    pub update: EntityUpdate,
}

impl PartialEq for PriorityQueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriorityQueueItem {}

impl PartialOrd for PriorityQueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityQueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Scores parts and presences for one viewer.
#[derive(Clone, Copy, Debug)]
pub struct Prioritizer {
    scheme: PrioritizationScheme,
    root_offset: f64,
}

impl Prioritizer {
    /// Builds a ranker from configuration.
    #[must_use]
    pub fn new(config: &InterestConfig) -> Self {
        Self { scheme: config.prioritization, root_offset: config.root_priority_offset }
    }

    /// Score of `part` belonging to `group`.
    #[must_use]
    pub fn priority_for_part(
        &self,
        viewer: &PresenceSnapshot,
        group: &GroupSnapshot,
        part: &PartSnapshot,
    ) -> f64 {
        let root = group.root().map_or(group.position, |r| r.position);
        let root_priority = self.raw_part(viewer, group, root) - self.root_offset;
        if part.is_root {
            return root_priority;
        }
        let child = self.raw_part(viewer, group, part.position);
        if child <= root_priority {
            root_priority + self.root_offset
        } else {
            child
        }
    }

    /// Score of another presence.
    #[must_use]
    pub fn priority_for_presence(
        &self,
        viewer: &PresenceSnapshot,
        presence: &PresenceSnapshot,
    ) -> f64 {
        if presence.id == viewer.id {
            return f64::MIN;
        }
        match self.scheme {
            PrioritizationScheme::Distance => distance(viewer, presence.position),
            PrioritizationScheme::FrontBack => front_back(viewer, presence.position),
            PrioritizationScheme::BestAvatarResponsiveness => {
                front_back(viewer, presence.position) * AVATAR_SCALE
            }
        }
    }

    /// Orders baseline records for every part of `groups`, most relevant
    /// first, each root ahead of its own children.
    #[must_use]
    pub fn order_full_scan(
        &self,
        viewer: &PresenceSnapshot,
        groups: &[Arc<GroupSnapshot>],
    ) -> Vec<EntityUpdate> {
        let mut heap = BinaryHeap::new();
        let mut seq = 0_u64;
        for group in groups {
            let parts = group.root().into_iter().chain(group.children());
            for part in parts {
                heap.push(PriorityQueueItem {
                    priority: self.priority_for_part(viewer, group, part),
                    seq,
                    update: EntityUpdate::part(Arc::clone(part), UpdateFlags::forced_full()),
                });
                seq += 1;
            }
        }
        let mut ordered = Vec::with_capacity(heap.len());
        while let Some(item) = heap.pop() {
            ordered.push(item.update);
        }
        ordered
    }

    /// Orders presences, most relevant first.
    #[must_use]
    pub fn order_presences(
        &self,
        viewer: &PresenceSnapshot,
        mut presences: Vec<Arc<PresenceSnapshot>>,
    ) -> Vec<Arc<PresenceSnapshot>> {
        presences.sort_by(|a, b| {
            self.priority_for_presence(viewer, a)
                .total_cmp(&self.priority_for_presence(viewer, b))
        });
        presences
    }

    fn raw_part(&self, viewer: &PresenceSnapshot, group: &GroupSnapshot, position: Vec3) -> f64 {
        match self.scheme {
            PrioritizationScheme::Distance => distance(viewer, position),
            PrioritizationScheme::FrontBack => front_back(viewer, position),
            PrioritizationScheme::BestAvatarResponsiveness => {
                let score = front_back(viewer, position);
                if group.attached_to.is_some() {
                    score * AVATAR_SCALE
                } else {
                    score
                }
            }
        }
    }
}

fn distance(viewer: &PresenceSnapshot, position: Vec3) -> f64 {
    f64::from(viewer.view_origin().distance(position))
}

fn front_back(viewer: &PresenceSnapshot, position: Vec3) -> f64 {
    let origin = viewer.view_origin();
    let d = f64::from(origin.distance(position));
    if viewer.is_child_agent {
        return d;
    }
    if (position - origin).dot(viewer.camera_at_axis) < 0.0 {
        d * BEHIND_PENALTY
    } else {
        d
    }
}
