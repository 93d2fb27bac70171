//! # Visibility Oracle
//!
//! Decides whether an entity is visible to a viewer right now. Answers are
//! deterministic for identical inputs and memoised per entity until the
//! viewer or the entity moves, or [`Culler::reset`] is called.
//!
//! ## Tests, in order
//!
//! ```text
//! culling disabled ─────────────► visible
//! draw distance == 0 ───────────► hidden
//! draw distance covers region ──► visible
//! sphere(pos, radius) within draw distance of view origin?
//!     no  ──────────────────────► hidden
//!     yes, FOV culling on and outside near radius:
//!         inside cone? ─────────► visible / hidden
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use vista_core::{EntityId, GroupSnapshot, PresenceSnapshot, RegionInfo, Vec3};

use crate::config::InterestConfig;

/// Cache entries above this count are dropped wholesale.
const MAX_CACHE_ENTRIES: usize = 65_536;

/// Inputs that fully determine one answer, compared bit-for-bit.
#[derive(Clone, Copy, PartialEq, Eq)]
struct ViewKey {
    origin: [u32; 3],
    axis: [u32; 3],
    draw_distance: u32,
    target: [u32; 3],
    radius: u32,
}

impl ViewKey {
    fn new(viewer: &PresenceSnapshot, draw_distance: f32, target: Vec3, radius: f32) -> Self {
        let bits = |v: Vec3| [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
        Self {
            origin: bits(viewer.view_origin()),
            axis: bits(viewer.camera_at_axis),
            draw_distance: draw_distance.to_bits(),
            target: bits(target),
            radius: radius.to_bits(),
        }
    }
}

/// Per-viewer visibility tests with a memo cache.
pub struct Culler {
    use_culling: bool,
    fov_culling: bool,
    cos_half_fov: f32,
    near_radius: f32,
    min_draw_distance: f32,
    cache: Mutex<HashMap<EntityId, (ViewKey, bool)>>,
    cache_hits: AtomicU64,
    evaluations: AtomicU64,
}

impl Culler {
    /// Builds a culler from configuration.
    #[must_use]
    pub fn new(config: &InterestConfig) -> Self {
        let half_fov = config.fov_degrees.to_radians() * 0.5;
        Self {
            use_culling: config.use_culling,
            fov_culling: config.fov_culling && config.fov_degrees < 360.0,
            cos_half_fov: half_fov.cos(),
            near_radius: config.near_radius,
            min_draw_distance: config.min_draw_distance,
            cache: Mutex::new(HashMap::new()),
            cache_hits: AtomicU64::new(0),
            evaluations: AtomicU64::new(0),
        }
    }

    /// Draw distance actually used: zero stays zero, anything else is
    /// raised to the configured floor.
    #[inline]
    #[must_use]
    pub fn effective_draw_distance(&self, viewer: &PresenceSnapshot) -> f32 {
        if viewer.draw_distance <= 0.0 {
            0.0
        } else {
            viewer.draw_distance.max(self.min_draw_distance)
        }
    }

    /// True when the draw distance exceeds both region dimensions, making
    /// everything in the region visible.
    #[must_use]
    pub fn covers_region(&self, viewer: &PresenceSnapshot, region: &RegionInfo) -> bool {
        let dd = self.effective_draw_distance(viewer);
        dd > region.size_x && dd > region.size_y
    }

    /// Visibility of a composite entity. Deleted groups are never visible.
    pub fn visible_group(
        &self,
        viewer: &PresenceSnapshot,
        region: &RegionInfo,
        group: &GroupSnapshot,
    ) -> bool {
        if group.deleted {
            return false;
        }
        self.visible(viewer, region, group.id, group.position, group.radius)
    }

    /// Visibility of a presence. A viewer always sees itself.
    pub fn visible_presence(
        &self,
        viewer: &PresenceSnapshot,
        region: &RegionInfo,
        presence: &PresenceSnapshot,
    ) -> bool {
        if presence.id == viewer.id {
            return true;
        }
        self.visible(viewer, region, presence.id, presence.position, 0.0)
    }

    /// Forgets every memoised answer.
    pub fn reset(&self) {
        self.cache.lock().clear();
    }

    /// (cache hits, fresh evaluations) since construction.
    #[must_use]
    pub fn counters(&self) -> (u64, u64) {
        (self.cache_hits.load(Ordering::Relaxed), self.evaluations.load(Ordering::Relaxed))
    }

    fn visible(
        &self,
        viewer: &PresenceSnapshot,
        region: &RegionInfo,
        id: EntityId,
        position: Vec3,
        radius: f32,
    ) -> bool {
        if !self.use_culling {
            return true;
        }
        let dd = self.effective_draw_distance(viewer);
        if dd <= 0.0 {
            return false;
        }
        if self.covers_region(viewer, region) {
            return true;
        }

        let key = ViewKey::new(viewer, dd, position, radius);
        if let Some((cached_key, answer)) = self.cache.lock().get(&id) {
            if *cached_key == key {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return *answer;
            }
        }

        let answer = self.evaluate(viewer, dd, position, radius);
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let mut cache = self.cache.lock();
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        cache.insert(id, (key, answer));
        answer
    }

    fn evaluate(&self, viewer: &PresenceSnapshot, dd: f32, position: Vec3, radius: f32) -> bool {
        let origin = viewer.view_origin();
        let reach = dd + radius;
        let dist_sq = origin.distance_squared(position);
        if dist_sq > reach * reach {
            return false;
        }
        if !self.fov_culling || viewer.is_child_agent {
            return true;
        }
        let near = self.near_radius + radius;
        if dist_sq <= near * near {
            return true;
        }
        let (Some(dir), Some(axis)) =
            ((position - origin).try_normalize(), viewer.camera_at_axis.try_normalize())
        else {
            return true;
        };
        dir.dot(axis) >= self.cos_half_fov
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(dd: f32) -> PresenceSnapshot {
        PresenceSnapshot::new(EntityId(1), Vec3::ZERO, dd)
    }

    fn group_at(x: f32) -> GroupSnapshot {
        GroupSnapshot::single(EntityId(10), EntityId(11), Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_distance_cull() {
        let culler = Culler::new(&InterestConfig::default());
        let region = RegionInfo::STANDARD;
        let v = viewer(32.0);
        assert!(culler.visible_group(&v, &region, &group_at(10.0)));
        assert!(!culler.visible_group(&v, &region, &group_at(40.0)));
    }

    #[test]
    fn test_zero_draw_distance_sees_nothing() {
        let culler = Culler::new(&InterestConfig::default());
        let v = viewer(0.0);
        assert!(!culler.visible_group(&v, &RegionInfo::STANDARD, &group_at(1.0)));
    }

    #[test]
    fn test_draw_distance_floor() {
        let culler = Culler::new(&InterestConfig::default());
        let v = viewer(5.0);
        assert_eq!(culler.effective_draw_distance(&v), 32.0);
        assert!(culler.visible_group(&v, &RegionInfo::STANDARD, &group_at(20.0)));
    }

    #[test]
    fn test_covers_region() {
        let culler = Culler::new(&InterestConfig::default());
        let v = viewer(512.0);
        assert!(culler.covers_region(&v, &RegionInfo::STANDARD));
        assert!(culler.visible_group(&v, &RegionInfo::STANDARD, &group_at(5_000.0)));
    }

    #[test]
    fn test_deleted_and_self() {
        let culler = Culler::new(&InterestConfig::default());
        let v = viewer(0.0);
        assert!(culler.visible_presence(&v, &RegionInfo::STANDARD, &v));

        let mut g = group_at(1.0);
        g.deleted = true;
        assert!(!culler.visible_group(&viewer(64.0), &RegionInfo::STANDARD, &g));
    }

    #[test]
    fn test_cache_hits_until_viewer_moves() {
        let culler = Culler::new(&InterestConfig::default());
        let region = RegionInfo::STANDARD;
        let g = group_at(10.0);
        let mut v = viewer(32.0);

        culler.visible_group(&v, &region, &g);
        culler.visible_group(&v, &region, &g);
        assert_eq!(culler.counters(), (1, 1));

        v.camera_position = Vec3::new(1.0, 0.0, 0.0);
        culler.visible_group(&v, &region, &g);
        assert_eq!(culler.counters(), (1, 2));

        culler.reset();
        culler.visible_group(&v, &region, &g);
        assert_eq!(culler.counters(), (1, 3));
    }

    #[test]
    fn test_fov_culling() {
        let config = InterestConfig { fov_culling: true, fov_degrees: 90.0, ..Default::default() };
        let culler = Culler::new(&config);
        let region = RegionInfo::STANDARD;
        let v = viewer(64.0);

        let ahead = group_at(30.0);
        let behind = GroupSnapshot::single(EntityId(20), EntityId(21), Vec3::new(-30.0, 0.0, 0.0));
        let near_behind = GroupSnapshot::single(EntityId(30), EntityId(31), Vec3::new(-2.0, 0.0, 0.0));

        assert!(culler.visible_group(&v, &region, &ahead));
        assert!(!culler.visible_group(&v, &region, &behind));
        assert!(culler.visible_group(&v, &region, &near_behind));
    }

    #[test]
    fn test_culling_disabled() {
        let config = InterestConfig { use_culling: false, ..Default::default() };
        let culler = Culler::new(&config);
        assert!(culler.visible_group(&viewer(0.0), &RegionInfo::STANDARD, &group_at(9_999.0)));
    }
}
