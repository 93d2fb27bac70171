//! # Collaborator Integration Layer
//!
//! The interest manager never owns the scene or the connection. It talks to
//! them through the capabilities defined here, which the host implements.
//!
//! - **World**: read-only queries over scene state
//! - **Transport**: delivery of batches to one remote viewer
//! - **Scene events**: change notifications the viewer subscribes to
//!
//! ## Data Flow
//!
//! ```text
//! scene mutation ──► EventBus::publish ──► SceneViewer (enqueue)
//!                                               │
//!                    WorldQuery ◄── scan ───────┤
//!                                               ▼
//!                    Transport  ◄── tick drain ─┘
//! ```
//!
//! In-memory implementations ([`MockWorld`], [`RecordingTransport`]) live in
//! [`mock`] for tests, benches and the simulator.

pub mod events;
pub mod mock;
pub mod traits;

pub use events::*;
pub use mock::*;
pub use traits::*;
