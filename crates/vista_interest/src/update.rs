//! # Pending Update Records
//!
//! What sits in the coalescing queues between a scene mutation and the next
//! drain. Each record holds the latest snapshot of its entity, so draining
//! always ships current state no matter how long the record waited.

use std::sync::Arc;

use vista_core::{
    AnimationGroup, EntityId, GroupSnapshot, PartSnapshot, PresenceSnapshot, PropertyFlags,
    UpdateFlags,
};

/// Merging of a newer notification into a pending record for the same
/// identity.
pub trait Coalesce {
    /// Folds `newer` into `self`. Must be idempotent for repeated input.
    fn merge(&mut self, newer: Self);
}

/// The entity an [`EntityUpdate`] describes.
#[derive(Clone, Debug)]
pub enum UpdateTarget {
    /// A connected participant's avatar.
    Presence(Arc<PresenceSnapshot>),
    /// One part of a composite entity.
    Part(Arc<PartSnapshot>),
}

impl UpdateTarget {
    /// Identity of the target.
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Presence(p) => p.id,
            Self::Part(p) => p.id,
        }
    }
}

/// Latest pending state change for one presence or part.
#[derive(Clone, Debug)]
pub struct EntityUpdate {
    /// Identity (same as `target.id()`).
    pub id: EntityId,
    /// Everything that changed since the last drain.
    pub flags: UpdateFlags,
    /// Most recent snapshot of the entity.
    pub target: UpdateTarget,
}

impl EntityUpdate {
    /// Update for a presence.
    #[must_use]
    pub fn presence(presence: Arc<PresenceSnapshot>, flags: UpdateFlags) -> Self {
        Self { id: presence.id, flags, target: UpdateTarget::Presence(presence) }
    }

    /// Update for a part.
    #[must_use]
    pub fn part(part: Arc<PartSnapshot>, flags: UpdateFlags) -> Self {
        Self { id: part.id, flags, target: UpdateTarget::Part(part) }
    }

    /// True when this record must go out as a full baseline.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.flags.is_full()
    }

    /// Baseline records for every part of `group`: root first, then
    /// children in part order.
    #[must_use]
    pub fn baseline_for(group: &GroupSnapshot) -> Vec<Self> {
        let mut updates = Vec::with_capacity(group.parts.len());
        if let Some(root) = group.root() {
            updates.push(Self::part(Arc::clone(root), UpdateFlags::forced_full()));
        }
        updates.extend(
            group
                .children()
                .map(|child| Self::part(Arc::clone(child), UpdateFlags::forced_full())),
        );
        updates
    }
}

impl Coalesce for EntityUpdate {
    fn merge(&mut self, newer: Self) {
        self.flags |= newer.flags;
        self.target = newer.target;
    }
}

/// Pending property change for one part.
#[derive(Clone, Debug)]
pub struct PropertiesUpdate {
    /// Most recent snapshot of the part.
    pub part: Arc<PartSnapshot>,
    /// Union of changed property fields.
    pub fields: PropertyFlags,
}

impl PropertiesUpdate {
    /// Creates a properties record.
    #[must_use]
    pub fn new(part: Arc<PartSnapshot>, fields: PropertyFlags) -> Self {
        Self { part, fields }
    }
}

impl Coalesce for PropertiesUpdate {
    fn merge(&mut self, newer: Self) {
        self.fields |= newer.fields;
        self.part = newer.part;
    }
}

impl Coalesce for AnimationGroup {
    fn merge(&mut self, newer: Self) {
        AnimationGroup::merge(self, newer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_core::Vec3;

    #[test]
    fn test_entity_merge_ors_flags_and_keeps_latest_snapshot() {
        let g = EntityId(1);
        let old = Arc::new(PartSnapshot::root(EntityId(2), g, Vec3::ZERO));
        let new = Arc::new(PartSnapshot::root(EntityId(2), g, Vec3::new(1.0, 0.0, 0.0)));

        let mut update = EntityUpdate::part(old, UpdateFlags::POSITION);
        update.merge(EntityUpdate::part(Arc::clone(&new), UpdateFlags::TEXTURES));

        assert_eq!(update.flags, UpdateFlags::POSITION | UpdateFlags::TEXTURES);
        match update.target {
            UpdateTarget::Part(p) => assert_eq!(p.position, new.position),
            UpdateTarget::Presence(_) => panic!("wrong target"),
        }
    }

    #[test]
    fn test_baseline_is_root_first() {
        let g = EntityId(1);
        let group = GroupSnapshot::new(
            g,
            Vec3::ZERO,
            1.0,
            vec![
                PartSnapshot::child(EntityId(3), g, Vec3::ZERO),
                PartSnapshot::root(EntityId(2), g, Vec3::ZERO),
            ],
        );
        let ids: Vec<_> = EntityUpdate::baseline_for(&group).iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![EntityId(2), EntityId(3)]);
        assert!(EntityUpdate::baseline_for(&group).iter().all(EntityUpdate::is_full));
    }

    #[test]
    fn test_properties_merge_unions_fields() {
        let part = Arc::new(PartSnapshot::root(EntityId(2), EntityId(1), Vec3::ZERO));
        let mut p = PropertiesUpdate::new(Arc::clone(&part), PropertyFlags::NAME);
        p.merge(PropertiesUpdate::new(part, PropertyFlags::OWNER));
        assert_eq!(p.fields, PropertyFlags::NAME | PropertyFlags::OWNER);
    }
}
