//! # Change Bitmasks
//!
//! Every mutation notification carries a bitmask of what changed. Pending
//! records coalesce by OR-ing these masks, so the bit layout only has to be
//! stable within one process.

use bitflags::bitflags;

bitflags! {
    /// What changed on a presence or part since the last update.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct UpdateFlags: u32 {
        /// World position.
        const POSITION = 1 << 0;
        /// Orientation.
        const ROTATION = 1 << 1;
        /// Linear velocity.
        const VELOCITY = 1 << 2;
        /// Linear acceleration.
        const ACCELERATION = 1 << 3;
        /// Angular velocity.
        const ANGULAR_VELOCITY = 1 << 4;
        /// Foot collision plane (presences).
        const COLLISION_PLANE = 1 << 5;
        /// Scale.
        const SCALE = 1 << 6;
        /// Shape parameters.
        const SHAPE = 1 << 7;
        /// Texture entries.
        const TEXTURES = 1 << 8;
        /// Hover text.
        const TEXT = 1 << 9;
        /// Particle system.
        const PARTICLES = 1 << 10;
        /// Attached sound.
        const SOUND = 1 << 11;
        /// Physical/phantom/temporary flags only.
        const PRIM_FLAGS = 1 << 12;
        /// Link parent.
        const PARENT = 1 << 13;
        /// Visual appearance (presences).
        const APPEARANCE = 1 << 14;
        /// The receiver has no baseline yet; send everything.
        const FORCED_FULL = 1 << 31;

        /// Movement-only subset, sendable as a terse update.
        const TERSE = Self::POSITION.bits()
            | Self::ROTATION.bits()
            | Self::VELOCITY.bits()
            | Self::ACCELERATION.bits()
            | Self::ANGULAR_VELOCITY.bits()
            | Self::COLLISION_PLANE.bits();

        /// Every state bit (without the forced marker).
        const FULL = Self::TERSE.bits()
            | Self::SCALE.bits()
            | Self::SHAPE.bits()
            | Self::TEXTURES.bits()
            | Self::TEXT.bits()
            | Self::PARTICLES.bits()
            | Self::SOUND.bits()
            | Self::PRIM_FLAGS.bits()
            | Self::PARENT.bits()
            | Self::APPEARANCE.bits();
    }
}

impl UpdateFlags {
    /// Flags for a baseline update: all state plus the forced marker.
    #[inline]
    #[must_use]
    pub const fn forced_full() -> Self {
        Self::FULL.union(Self::FORCED_FULL)
    }

    /// True when this record must be delivered as a full baseline.
    #[inline]
    #[must_use]
    pub const fn is_full(self) -> bool {
        self.contains(Self::FORCED_FULL)
    }

    /// True when nothing outside the terse subset changed.
    #[inline]
    #[must_use]
    pub const fn is_terse(self) -> bool {
        !self.is_empty() && Self::TERSE.contains(self)
    }
}

bitflags! {
    /// Which property fields of a part changed.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u16 {
        /// Display name.
        const NAME = 1 << 0;
        /// Description text.
        const DESCRIPTION = 1 << 1;
        /// Owner or group.
        const OWNER = 1 << 2;
        /// Permission masks.
        const PERMISSIONS = 1 << 3;
        /// Sale type and price.
        const SALE_INFO = 1 << 4;
        /// Category.
        const CATEGORY = 1 << 5;
        /// Touch action label.
        const TOUCH_TEXT = 1 << 6;
        /// Sit action label.
        const SIT_TEXT = 1 << 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_full_covers_everything() {
        let full = UpdateFlags::forced_full();
        assert!(full.is_full());
        assert!(full.contains(UpdateFlags::TERSE));
        assert!(full.contains(UpdateFlags::APPEARANCE));
        assert!(!UpdateFlags::FULL.is_full());
    }

    #[test]
    fn test_terse_detection() {
        assert!(UpdateFlags::POSITION.is_terse());
        assert!((UpdateFlags::POSITION | UpdateFlags::ROTATION).is_terse());
        assert!(!(UpdateFlags::POSITION | UpdateFlags::TEXTURES).is_terse());
        assert!(!UpdateFlags::empty().is_terse());
    }

    #[test]
    fn test_merge_keeps_forced_marker() {
        let merged = UpdateFlags::forced_full() | UpdateFlags::POSITION;
        assert!(merged.is_full());
    }
}
