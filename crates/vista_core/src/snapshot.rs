//! # World Snapshots
//!
//! Immutable views of scene state handed out by the world collaborator.
//! Snapshots are shared behind `Arc` so pending update records can hold on to
//! the entity they describe without copying it.
//!
//! ```text
//! GroupSnapshot (composite entity)
//!   ├── PartSnapshot (root)
//!   ├── PartSnapshot (child)
//!   └── PartSnapshot (child)
//!
//! PresenceSnapshot (avatar of a connected participant)
//! ```

use std::sync::Arc;

use crate::ids::EntityId;
use crate::math::Vec3;

/// Static facts about the region the viewer is connected to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionInfo {
    /// Region extent along X in metres.
    pub size_x: f32,
    /// Region extent along Y in metres.
    pub size_y: f32,
    /// Whether child agents in neighbouring regions may see into this one.
    pub see_into_from_neighbor: bool,
}

impl RegionInfo {
    /// Standard 256m square region.
    pub const STANDARD: Self = Self {
        size_x: 256.0,
        size_y: 256.0,
        see_into_from_neighbor: true,
    };
}

impl Default for RegionInfo {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// One part of a composite entity.
#[derive(Clone, Debug, PartialEq)]
pub struct PartSnapshot {
    /// Part identity.
    pub id: EntityId,
    /// Owning group.
    pub group: EntityId,
    /// True for the group's root part.
    pub is_root: bool,
    /// World position.
    pub position: Vec3,
}

impl PartSnapshot {
    /// Creates the root part of `group`.
    #[must_use]
    pub const fn root(id: EntityId, group: EntityId, position: Vec3) -> Self {
        Self { id, group, is_root: true, position }
    }

    /// Creates a non-root part of `group`.
    #[must_use]
    pub const fn child(id: EntityId, group: EntityId, position: Vec3) -> Self {
        Self { id, group, is_root: false, position }
    }
}

/// A composite entity: one root part and zero or more children.
#[derive(Clone, Debug)]
pub struct GroupSnapshot {
    /// Group identity.
    pub id: EntityId,
    /// Group centre in world space.
    pub position: Vec3,
    /// Bounding radius around `position`.
    pub radius: f32,
    /// Parts; the root is always present exactly once.
    pub parts: Vec<Arc<PartSnapshot>>,
    /// Set once the group has been removed from the scene.
    pub deleted: bool,
    /// Presence wearing this group, if it is an attachment.
    pub attached_to: Option<EntityId>,
}

impl GroupSnapshot {
    /// Creates a group from its parts.
    #[must_use]
    pub fn new(id: EntityId, position: Vec3, radius: f32, parts: Vec<PartSnapshot>) -> Self {
        Self {
            id,
            position,
            radius,
            parts: parts.into_iter().map(Arc::new).collect(),
            deleted: false,
            attached_to: None,
        }
    }

    /// Creates a single-part group whose root shares the group position.
    #[must_use]
    pub fn single(id: EntityId, root: EntityId, position: Vec3) -> Self {
        Self::new(id, position, 0.5, vec![PartSnapshot::root(root, id, position)])
    }

    /// Marks the group as worn by `wearer`.
    #[must_use]
    pub fn attached_to(mut self, wearer: EntityId) -> Self {
        self.attached_to = Some(wearer);
        self
    }

    /// The root part, if the snapshot is well formed.
    #[must_use]
    pub fn root(&self) -> Option<&Arc<PartSnapshot>> {
        self.parts.iter().find(|p| p.is_root)
    }

    /// Every part except the root.
    pub fn children(&self) -> impl Iterator<Item = &Arc<PartSnapshot>> {
        self.parts.iter().filter(|p| !p.is_root)
    }

    /// Looks up a part by id.
    #[must_use]
    pub fn part(&self, id: EntityId) -> Option<&Arc<PartSnapshot>> {
        self.parts.iter().find(|p| p.id == id)
    }
}

/// The avatar of a connected participant.
#[derive(Clone, Debug, PartialEq)]
pub struct PresenceSnapshot {
    /// Presence identity.
    pub id: EntityId,
    /// Avatar position in world space.
    pub position: Vec3,
    /// Camera eye position.
    pub camera_position: Vec3,
    /// Camera forward axis (not necessarily normalised).
    pub camera_at_axis: Vec3,
    /// Avatar velocity.
    pub velocity: Vec3,
    /// Configured view radius; zero disables drawing entirely.
    pub draw_distance: f32,
    /// Observing from a neighbouring region rather than standing in this one.
    pub is_child_agent: bool,
    /// Crossing between regions right now.
    pub in_transit: bool,
}

impl PresenceSnapshot {
    /// Creates a root-agent presence standing at `position` with the camera
    /// on the avatar.
    #[must_use]
    pub const fn new(id: EntityId, position: Vec3, draw_distance: f32) -> Self {
        Self {
            id,
            position,
            camera_position: position,
            camera_at_axis: Vec3::X,
            velocity: Vec3::ZERO,
            draw_distance,
            is_child_agent: false,
            in_transit: false,
        }
    }

    /// Point that distances are measured from: the camera for agents in this
    /// region, the avatar itself for child agents.
    #[inline]
    #[must_use]
    pub fn view_origin(&self) -> Vec3 {
        if self.is_child_agent {
            self.position
        } else {
            self.camera_position
        }
    }
}

/// One playing animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationEntry {
    /// Animation asset.
    pub animation: EntityId,
    /// Monotonic sequence number assigned by the animator.
    pub sequence: u32,
}

/// Coalesced animation state for one presence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationGroup {
    /// Presence being animated.
    pub presence: EntityId,
    /// Animations in the order they were started.
    pub animations: Vec<AnimationEntry>,
}

impl AnimationGroup {
    /// Creates an animation group.
    #[must_use]
    pub fn new(presence: EntityId, animations: Vec<AnimationEntry>) -> Self {
        Self { presence, animations }
    }

    /// Folds a newer notification for the same presence into this one.
    ///
    /// Entries for an animation already present take the newer sequence;
    /// unseen animations are appended.
    pub fn merge(&mut self, newer: Self) {
        for entry in newer.animations {
            match self.animations.iter_mut().find(|e| e.animation == entry.animation) {
                Some(existing) => existing.sequence = existing.sequence.max(entry.sequence),
                None => self.animations.push(entry),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> GroupSnapshot {
        let g = EntityId(10);
        GroupSnapshot::new(
            g,
            Vec3::new(1.0, 1.0, 0.0),
            2.0,
            vec![
                PartSnapshot::child(EntityId(12), g, Vec3::ZERO),
                PartSnapshot::root(EntityId(11), g, Vec3::ZERO),
                PartSnapshot::child(EntityId(13), g, Vec3::ZERO),
            ],
        )
    }

    #[test]
    fn test_root_and_children() {
        let g = group();
        assert_eq!(g.root().unwrap().id, EntityId(11));
        let children: Vec<_> = g.children().map(|p| p.id).collect();
        assert_eq!(children, vec![EntityId(12), EntityId(13)]);
        assert!(g.part(EntityId(13)).is_some());
        assert!(g.part(EntityId(99)).is_none());
    }

    #[test]
    fn test_view_origin_for_child_agent() {
        let mut p = PresenceSnapshot::new(EntityId(1), Vec3::new(5.0, 5.0, 0.0), 64.0);
        p.camera_position = Vec3::new(9.0, 9.0, 0.0);
        assert_eq!(p.view_origin(), Vec3::new(9.0, 9.0, 0.0));
        p.is_child_agent = true;
        assert_eq!(p.view_origin(), Vec3::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn test_animation_merge() {
        let anim = |id, seq| AnimationEntry { animation: EntityId(id), sequence: seq };
        let mut a = AnimationGroup::new(EntityId(1), vec![anim(100, 1)]);
        a.merge(AnimationGroup::new(EntityId(1), vec![anim(100, 4), anim(200, 5)]));
        assert_eq!(a.animations, vec![anim(100, 4), anim(200, 5)]);
    }
}
