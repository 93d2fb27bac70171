//! Vector math for visibility and relevance scoring.
//!
//! Culling compares squared distances against squared draw distances and
//! checks view cones with a dot product between unit directions. Ranking
//! needs true distances. Nothing else is provided.

use std::ops::{Add, Sub};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A point or direction in region space, in metres.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// East.
    pub x: f32,
    /// North.
    pub y: f32,
    /// Up.
    pub z: f32,
}

impl Vec3 {
    /// The region origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Facing east; where a fresh camera looks.
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Point at the given coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Dot product; the cosine of the angle for unit directions.
    #[must_use]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x.mul_add(rhs.x, self.y.mul_add(rhs.y, self.z * rhs.z))
    }

    /// Squared magnitude. Cheap enough for per-part culling.
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Squared distance; compare against a squared radius.
    #[must_use]
    pub fn distance_squared(self, to: Self) -> f32 {
        (to - self).length_squared()
    }

    /// Distance in metres.
    #[must_use]
    pub fn distance(self, to: Self) -> f32 {
        self.distance_squared(to).sqrt()
    }

    /// Same direction at unit length. `None` when there is no meaningful
    /// direction, e.g. a target sitting on the camera.
    #[must_use]
    pub fn try_normalize(self) -> Option<Self> {
        let magnitude = self.length_squared().sqrt();
        (magnitude > f32::EPSILON)
            .then(|| Self::new(self.x / magnitude, self.y / magnitude, self.z / magnitude))
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_distance_comparison_uses_squares() {
        let viewer = Vec3::new(10.0, 10.0, 20.0);
        let part = Vec3::new(13.0, 14.0, 20.0);
        assert_eq!(viewer.distance_squared(part), 25.0);
        assert_eq!(part.distance(viewer), 5.0);
        assert!(viewer.distance_squared(part) <= 5.0 * 5.0);
    }

    #[test]
    fn test_view_cone_directions() {
        let camera = Vec3::new(0.0, 3.0, 0.0).try_normalize().unwrap();
        let ahead = (Vec3::new(0.0, 50.0, 0.0) - Vec3::ZERO).try_normalize().unwrap();
        let behind = Vec3::new(0.0, -2.0, 0.0).try_normalize().unwrap();
        assert!((camera.dot(ahead) - 1.0).abs() < 1e-6);
        assert!(camera.dot(behind) < 0.0);
        assert_eq!(camera.dot(Vec3::X), 0.0);
    }

    #[test]
    fn test_no_direction_to_self() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!((p - p).try_normalize().is_none());
        assert_eq!(p + Vec3::ZERO, p);
    }
}
