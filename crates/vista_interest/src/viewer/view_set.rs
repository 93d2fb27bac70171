//! # View Set
//!
//! Identities the remote viewer currently holds a baseline for. Membership
//! is what separates "send a delta" from "send a full update first".

use std::collections::HashSet;

use vista_core::EntityId;

/// Groups and presences believed to be known to the remote viewer.
#[derive(Debug, Default)]
pub struct ViewSet {
    groups: HashSet<EntityId>,
    presences: HashSet<EntityId>,
}

impl ViewSet {
    /// True if the viewer holds a baseline for `group`.
    #[must_use]
    pub fn has_group(&self, group: EntityId) -> bool {
        self.groups.contains(&group)
    }

    /// True if the viewer holds a baseline for `presence`.
    #[must_use]
    pub fn has_presence(&self, presence: EntityId) -> bool {
        self.presences.contains(&presence)
    }

    /// Marks a group as known. Returns false if it already was.
    pub fn insert_group(&mut self, group: EntityId) -> bool {
        self.groups.insert(group)
    }

    /// Marks a presence as known. Returns false if it already was.
    pub fn insert_presence(&mut self, presence: EntityId) -> bool {
        self.presences.insert(presence)
    }

    /// Forgets a group.
    pub fn remove_group(&mut self, group: EntityId) -> bool {
        self.groups.remove(&group)
    }

    /// Forgets a presence.
    pub fn remove_presence(&mut self, presence: EntityId) -> bool {
        self.presences.remove(&presence)
    }

    /// (groups, presences) counts.
    #[must_use]
    pub fn len(&self) -> (usize, usize) {
        (self.groups.len(), self.presences.len())
    }

    /// True when nothing is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.presences.is_empty()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.presences.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let mut view = ViewSet::default();
        assert!(view.insert_group(EntityId(1)));
        assert!(!view.insert_group(EntityId(1)));
        assert!(view.insert_presence(EntityId(2)));
        assert_eq!(view.len(), (1, 1));

        assert!(view.remove_presence(EntityId(2)));
        assert!(!view.has_presence(EntityId(2)));
        view.clear();
        assert!(view.is_empty());
    }
}
