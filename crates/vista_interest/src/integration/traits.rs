//! # Integration Traits
//!
//! Capabilities the host implements so a [`SceneViewer`](crate::SceneViewer)
//! can read the world, reach its remote viewer and hear about changes.
//!
//! ```text
//! vista defines:         host implements:
//! ┌────────────────┐     ┌────────────────┐
//! │ trait World... │ ◄── │ impl World...  │
//! └────────────────┘     └────────────────┘
//! ```
//!
//! Every method may be called from any thread, concurrently.

use std::sync::Arc;

use vista_core::{AnimationGroup, EntityId, GroupSnapshot, PresenceSnapshot, RegionInfo};

use crate::error::{TransportResult, WorldResult};
use crate::integration::events::{SceneEvent, SubscriptionId};
use crate::update::{EntityUpdate, PropertiesUpdate};

// ============================================================================
// WORLD
// ============================================================================

/// Read-only view of scene state.
pub trait WorldQuery: Send + Sync {
    /// Region the viewer is connected to.
    ///
    /// # Errors
    ///
    /// Fails if the region is not loaded.
    fn region(&self) -> WorldResult<RegionInfo>;

    /// Every composite entity in the region, including attachments.
    ///
    /// # Errors
    ///
    /// Fails if the scene cannot be enumerated right now.
    fn groups(&self) -> WorldResult<Vec<Arc<GroupSnapshot>>>;

    /// Every presence in the region.
    ///
    /// # Errors
    ///
    /// Fails if the scene cannot be enumerated right now.
    fn presences(&self) -> WorldResult<Vec<Arc<PresenceSnapshot>>>;

    /// Looks up one group.
    ///
    /// # Errors
    ///
    /// Fails if the scene cannot be queried right now.
    fn group(&self, id: EntityId) -> WorldResult<Option<Arc<GroupSnapshot>>>;

    /// Looks up one presence.
    ///
    /// # Errors
    ///
    /// Fails if the scene cannot be queried right now.
    fn presence(&self, id: EntityId) -> WorldResult<Option<Arc<PresenceSnapshot>>>;

    /// Groups worn by `wearer`.
    ///
    /// # Errors
    ///
    /// Fails if the scene cannot be queried right now.
    fn attachments(&self, wearer: EntityId) -> WorldResult<Vec<Arc<GroupSnapshot>>>;

    /// True while `id` (presence, group or part) still exists.
    fn contains(&self, id: EntityId) -> bool;
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Delivery channel to one remote viewer.
pub trait Transport: Send + Sync {
    /// Sends a presence's complete state.
    ///
    /// # Errors
    ///
    /// Fails if the connection refused or dropped the message.
    fn send_full_update(&self, presence: &PresenceSnapshot) -> TransportResult<()>;

    /// Sends a batch of presence or part updates. Records flagged full carry
    /// complete state for their part.
    ///
    /// # Errors
    ///
    /// Fails if the connection refused or dropped the batch.
    fn send_delta_batch(&self, updates: &[EntityUpdate]) -> TransportResult<()>;

    /// Sends one presence's animation state.
    ///
    /// # Errors
    ///
    /// Fails if the connection refused or dropped the message.
    fn send_animations(&self, animations: &AnimationGroup) -> TransportResult<()>;

    /// Sends a batch of property changes.
    ///
    /// # Errors
    ///
    /// Fails if the connection refused or dropped the batch.
    fn send_properties(&self, updates: &[PropertiesUpdate]) -> TransportResult<()>;
}

// ============================================================================
// SCENE EVENTS
// ============================================================================

/// Receiver of scene change notifications.
pub trait SceneEventHandler: Send + Sync {
    /// Handles one event. Called on the publishing thread.
    fn on_event(&self, event: &SceneEvent);
}

/// Subscription point for scene change notifications.
pub trait SceneEvents: Send + Sync {
    /// Registers `handler` for every future event.
    fn subscribe(&self, handler: Arc<dyn SceneEventHandler>) -> SubscriptionId;

    /// Removes a subscription. Returns false if it was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
