//! # VISTA Core
//!
//! Shared scene vocabulary for the VISTA interest-management stack.
//!
//! ## Contents
//!
//! - [`Vec3`] - positions, camera axes, velocities
//! - [`EntityId`] - one identity space for presences, groups and parts
//! - [`UpdateFlags`] / [`PropertyFlags`] - coalescable change bitmasks
//! - Snapshots - immutable views of the world handed out by the scene
//!
//! ## Example
//!
//! ```rust
//! use vista_core::{EntityId, GroupSnapshot, UpdateFlags, Vec3};
//!
//! let crate_box = GroupSnapshot::single(EntityId(1), EntityId(2), Vec3::new(10.0, 0.0, 0.0));
//! assert!(crate_box.root().is_some());
//!
//! let merged = UpdateFlags::POSITION | UpdateFlags::ROTATION;
//! assert!(merged.is_terse());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod flags;
pub mod ids;
pub mod math;
pub mod snapshot;

pub use flags::{PropertyFlags, UpdateFlags};
pub use ids::EntityId;
pub use math::Vec3;
pub use snapshot::{
    AnimationEntry, AnimationGroup, GroupSnapshot, PartSnapshot, PresenceSnapshot, RegionInfo,
};
