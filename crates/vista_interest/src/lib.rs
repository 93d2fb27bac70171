//! # VISTA Interest Management
//!
//! Per-viewer interest management and update scheduling for a shared 3D
//! scene. For each connected viewer a [`SceneViewer`] decides what the
//! viewer should hear about, keeps at most one pending record per entity,
//! and streams changes within per-tick budgets.
//!
//! ## Components
//!
//! - [`Culler`] - visibility oracle (draw distance, FOV, memo cache)
//! - [`Prioritizer`] - relevance ranker, roots ahead of children
//! - [`Coalescer`] - four independently locked pending containers
//! - [`SceneViewer`] - view sets, scans, debounced recompute, tick drain
//! - [`WorkerPool`] / [`Debouncer`] - background scans and quiet-window timer
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vista_core::{EntityId, GroupSnapshot, PresenceSnapshot, Vec3};
//! use vista_interest::{
//!     EventBus, InterestConfig, MockWorld, RecordingTransport, SceneViewer, WorkerPool,
//! };
//!
//! let world = Arc::new(MockWorld::default());
//! world.insert_presence(PresenceSnapshot::new(EntityId(1), Vec3::ZERO, 64.0));
//! world.insert_group(GroupSnapshot::single(EntityId(10), EntityId(11), Vec3::new(5.0, 0.0, 0.0)));
//!
//! let transport = Arc::new(RecordingTransport::new());
//! let bus = Arc::new(EventBus::new());
//! let pool = Arc::new(WorkerPool::new(1, 16).unwrap());
//! let config = InterestConfig { warmup_ticks: 0, ..Default::default() };
//!
//! let viewer = SceneViewer::new(EntityId(1), config, world, transport, bus, pool).unwrap();
//! let report = viewer.tick(100, 10);
//! assert!(!report.is_skipped());
//! viewer.close();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod coalescer;
pub mod config;
pub mod culler;
pub mod debounce;
pub mod error;
pub mod integration;
pub mod prioritizer;
pub mod stats;
pub mod update;
pub mod viewer;
pub mod worker;

pub use coalescer::{Coalescer, Enqueued, PendingCounts, PendingQueue, Requeue};
pub use config::{InterestConfig, PrioritizationScheme};
pub use culler::Culler;
pub use debounce::{DebounceTrigger, Debouncer};
pub use error::{
    ConfigError, InterestError, InterestResult, TransportError, TransportResult, WorldError,
    WorldResult,
};
pub use integration::{
    EventBus, MockWorld, Observed, RecordingTransport, SceneEvent, SceneEventHandler, SceneEvents,
    Sent, SubscriptionId, Transport, WorldQuery,
};
pub use prioritizer::{PriorityQueueItem, Prioritizer};
pub use stats::{ViewerStats, ViewerStatsSnapshot};
pub use update::{Coalesce, EntityUpdate, PropertiesUpdate, UpdateTarget};
pub use viewer::{SceneViewer, SkipReason, TickReport, ViewSet};
pub use worker::WorkerPool;

/// Default per-tick budget for property and part records.
pub const DEFAULT_PRIM_BUDGET: usize = 100;

/// Default per-tick budget for presence and animation records.
pub const DEFAULT_PRESENCE_BUDGET: usize = 60;
