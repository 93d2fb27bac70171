//! # In-Memory Collaborators
//!
//! A mutable world and a recording transport. Both support failure
//! injection so retry paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use vista_core::{
    AnimationGroup, EntityId, GroupSnapshot, PresenceSnapshot, PropertyFlags, RegionInfo,
    UpdateFlags, Vec3,
};

use crate::error::{TransportError, TransportResult, WorldError, WorldResult};
use crate::integration::traits::{Transport, WorldQuery};
use crate::update::{EntityUpdate, PropertiesUpdate};

/// Consumes one injected failure, if any are left.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}

// ============================================================================
// WORLD
// ============================================================================

/// Mutable in-memory scene.
pub struct MockWorld {
    region: RwLock<RegionInfo>,
    region_loaded: AtomicBool,
    groups: RwLock<IndexMap<EntityId, Arc<GroupSnapshot>>>,
    part_index: RwLock<HashMap<EntityId, EntityId>>,
    presences: RwLock<IndexMap<EntityId, Arc<PresenceSnapshot>>>,
    enumeration_failures: AtomicU32,
    enumeration_panics: AtomicU32,
}

impl MockWorld {
    /// Creates an empty scene for `region`.
    #[must_use]
    pub fn new(region: RegionInfo) -> Self {
        Self {
            region: RwLock::new(region),
            region_loaded: AtomicBool::new(true),
            groups: RwLock::new(IndexMap::new()),
            part_index: RwLock::new(HashMap::new()),
            presences: RwLock::new(IndexMap::new()),
            enumeration_failures: AtomicU32::new(0),
            enumeration_panics: AtomicU32::new(0),
        }
    }

    /// Adds or replaces a group.
    pub fn insert_group(&self, group: GroupSnapshot) -> Arc<GroupSnapshot> {
        let group = Arc::new(group);
        let mut groups = self.groups.write();
        let mut index = self.part_index.write();
        if let Some(old) = groups.insert(group.id, Arc::clone(&group)) {
            for part in &old.parts {
                index.remove(&part.id);
            }
        }
        for part in &group.parts {
            index.insert(part.id, group.id);
        }
        group
    }

    /// Removes a group and its parts.
    pub fn remove_group(&self, id: EntityId) -> Option<Arc<GroupSnapshot>> {
        let mut groups = self.groups.write();
        let removed = groups.shift_remove(&id)?;
        let mut index = self.part_index.write();
        for part in &removed.parts {
            index.remove(&part.id);
        }
        Some(removed)
    }

    /// Translates a group and all its parts so the group centre lands on
    /// `to`. Returns the new snapshot.
    pub fn move_group(&self, id: EntityId, to: Vec3) -> Option<Arc<GroupSnapshot>> {
        let current = self.groups.read().get(&id).cloned()?;
        let offset = to - current.position;
        let mut moved = (*current).clone();
        moved.position = to;
        moved.parts = current
            .parts
            .iter()
            .map(|part| {
                let mut part = (**part).clone();
                part.position = part.position + offset;
                Arc::new(part)
            })
            .collect();
        Some(self.insert_group(moved))
    }

    /// Adds or replaces a presence.
    pub fn insert_presence(&self, presence: PresenceSnapshot) -> Arc<PresenceSnapshot> {
        let presence = Arc::new(presence);
        self.presences.write().insert(presence.id, Arc::clone(&presence));
        presence
    }

    /// Applies `change` to a copy of the presence and stores it.
    pub fn update_presence<F>(&self, id: EntityId, change: F) -> Option<Arc<PresenceSnapshot>>
    where
        F: FnOnce(&mut PresenceSnapshot),
    {
        let mut presences = self.presences.write();
        let current = presences.get(&id)?;
        let mut next = (**current).clone();
        change(&mut next);
        let next = Arc::new(next);
        presences.insert(id, Arc::clone(&next));
        Some(next)
    }

    /// Removes a presence.
    pub fn remove_presence(&self, id: EntityId) -> Option<Arc<PresenceSnapshot>> {
        self.presences.write().shift_remove(&id)
    }

    /// Makes the next `count` enumerations fail.
    pub fn fail_enumerations(&self, count: u32) {
        self.enumeration_failures.store(count, Ordering::Release);
    }

    /// Makes the next `count` enumerations panic, as a broken collaborator
    /// would.
    pub fn panic_enumerations(&self, count: u32) {
        self.enumeration_panics.store(count, Ordering::Release);
    }

    /// Loads or unloads the region.
    pub fn set_region_loaded(&self, loaded: bool) {
        self.region_loaded.store(loaded, Ordering::Release);
    }

    /// Replaces the region description.
    pub fn set_region(&self, region: RegionInfo) {
        *self.region.write() = region;
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }

    fn enumerate_guard(&self) -> WorldResult<()> {
        assert!(!take_failure(&self.enumeration_panics), "injected enumeration panic");
        if take_failure(&self.enumeration_failures) {
            return Err(WorldError::Unavailable("injected enumeration failure".into()));
        }
        Ok(())
    }
}

impl Default for MockWorld {
    fn default() -> Self {
        Self::new(RegionInfo::STANDARD)
    }
}

impl WorldQuery for MockWorld {
    fn region(&self) -> WorldResult<RegionInfo> {
        if !self.region_loaded.load(Ordering::Acquire) {
            return Err(WorldError::RegionNotLoaded);
        }
        Ok(*self.region.read())
    }

    fn groups(&self) -> WorldResult<Vec<Arc<GroupSnapshot>>> {
        self.enumerate_guard()?;
        Ok(self.groups.read().values().cloned().collect())
    }

    fn presences(&self) -> WorldResult<Vec<Arc<PresenceSnapshot>>> {
        self.enumerate_guard()?;
        Ok(self.presences.read().values().cloned().collect())
    }

    fn group(&self, id: EntityId) -> WorldResult<Option<Arc<GroupSnapshot>>> {
        Ok(self.groups.read().get(&id).cloned())
    }

    fn presence(&self, id: EntityId) -> WorldResult<Option<Arc<PresenceSnapshot>>> {
        Ok(self.presences.read().get(&id).cloned())
    }

    fn attachments(&self, wearer: EntityId) -> WorldResult<Vec<Arc<GroupSnapshot>>> {
        Ok(self
            .groups
            .read()
            .values()
            .filter(|g| g.attached_to == Some(wearer))
            .cloned()
            .collect())
    }

    fn contains(&self, id: EntityId) -> bool {
        self.presences.read().contains_key(&id)
            || self.groups.read().contains_key(&id)
            || self.part_index.read().contains_key(&id)
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// One transport call as recorded.
#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    /// `send_full_update`.
    Full(EntityId),
    /// `send_delta_batch`, as (id, flags) pairs.
    Delta(Vec<(EntityId, UpdateFlags)>),
    /// `send_animations`.
    Animations(EntityId),
    /// `send_properties`, as (part, fields) pairs.
    Properties(Vec<(EntityId, PropertyFlags)>),
}

/// What one identity received, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observed {
    /// A full baseline.
    Full,
    /// An incremental update.
    Delta(UpdateFlags),
}

/// Transport that records every call instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failures: AtomicU32,
}

impl RecordingTransport {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Takes and clears the recording.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Makes the next `count` calls fail.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::Release);
    }

    /// Movement/appearance history of one identity.
    #[must_use]
    pub fn history_for(&self, id: EntityId) -> Vec<Observed> {
        let mut history = Vec::new();
        for call in self.sent.lock().iter() {
            match call {
                Sent::Full(who) if *who == id => history.push(Observed::Full),
                Sent::Delta(batch) => {
                    for (who, flags) in batch {
                        if *who == id {
                            history.push(if flags.is_full() {
                                Observed::Full
                            } else {
                                Observed::Delta(*flags)
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        history
    }

    fn record(&self, call: Sent) -> TransportResult<()> {
        if take_failure(&self.failures) {
            return Err(TransportError::Rejected("injected failure".into()));
        }
        self.sent.lock().push(call);
        Ok(())
    }
}

impl Transport for RecordingTransport {
    fn send_full_update(&self, presence: &PresenceSnapshot) -> TransportResult<()> {
        self.record(Sent::Full(presence.id))
    }

    fn send_delta_batch(&self, updates: &[EntityUpdate]) -> TransportResult<()> {
        self.record(Sent::Delta(updates.iter().map(|u| (u.id, u.flags)).collect()))
    }

    fn send_animations(&self, animations: &AnimationGroup) -> TransportResult<()> {
        self.record(Sent::Animations(animations.presence))
    }

    fn send_properties(&self, updates: &[PropertiesUpdate]) -> TransportResult<()> {
        self.record(Sent::Properties(updates.iter().map(|u| (u.part.id, u.fields)).collect()))
    }
}
