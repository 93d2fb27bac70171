//! # Scene Events
//!
//! Change notifications published by the scene and the in-process bus that
//! fans them out to subscribed viewers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use vista_core::{AnimationGroup, PartSnapshot, PresenceSnapshot, UpdateFlags};

use crate::integration::traits::{SceneEventHandler, SceneEvents};
use crate::update::PropertiesUpdate;

// ============================================================================
// EVENTS
// ============================================================================

/// A change in the scene that may interest a viewer.
#[derive(Clone, Debug)]
pub enum SceneEvent {
    /// A part moved or changed appearance. Spawns arrive as full flags.
    EntityChanged {
        /// Latest part snapshot.
        part: Arc<PartSnapshot>,
        /// What changed.
        flags: UpdateFlags,
    },
    /// Property fields of one or more parts changed.
    PropertiesChanged {
        /// One record per part.
        updates: Vec<PropertiesUpdate>,
    },
    /// A presence moved or changed appearance.
    PresenceMoved {
        /// Latest presence snapshot.
        presence: Arc<PresenceSnapshot>,
        /// What changed.
        flags: UpdateFlags,
    },
    /// A presence's animation state changed.
    PresenceAnimated {
        /// Latest presence snapshot.
        presence: Arc<PresenceSnapshot>,
        /// New animation state.
        animations: AnimationGroup,
    },
    /// A presence is leaving the region.
    PresenceClosing {
        /// Departing presence.
        presence: Arc<PresenceSnapshot>,
    },
    /// A presence became a child agent of this region.
    MadeChildAgent {
        /// Demoted presence.
        presence: Arc<PresenceSnapshot>,
    },
    /// A presence changed its draw distance.
    DrawDistanceChanged {
        /// Presence with the new draw distance.
        presence: Arc<PresenceSnapshot>,
    },
    /// A presence's camera moved independently of its avatar.
    CameraChanged {
        /// Presence with the new camera.
        presence: Arc<PresenceSnapshot>,
    },
}

impl SceneEvent {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EntityChanged { .. } => "entity_changed",
            Self::PropertiesChanged { .. } => "properties_changed",
            Self::PresenceMoved { .. } => "presence_moved",
            Self::PresenceAnimated { .. } => "presence_animated",
            Self::PresenceClosing { .. } => "presence_closing",
            Self::MadeChildAgent { .. } => "made_child_agent",
            Self::DrawDistanceChanged { .. } => "draw_distance_changed",
            Self::CameraChanged { .. } => "camera_changed",
        }
    }
}

/// Handle returned by [`SceneEvents::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

// ============================================================================
// EVENT BUS
// ============================================================================

/// Synchronous fan-out of scene events to subscribers.
///
/// Handlers run on the publishing thread, outside the bus lock, so a handler
/// may subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, Arc<dyn SceneEventHandler>)>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every current subscriber.
    pub fn publish(&self, event: &SceneEvent) {
        let handlers: Vec<_> =
            self.handlers.read().iter().map(|(_, h)| Arc::clone(h)).collect();
        tracing::trace!(kind = event.kind(), subscribers = handlers.len(), "publish");
        for handler in handlers {
            handler.on_event(event);
        }
    }

    /// Current subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl SceneEvents for EventBus {
    fn subscribe(&self, handler: Arc<dyn SceneEventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        handlers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use vista_core::{EntityId, Vec3};

    #[derive(Default)]
    struct Counter(Mutex<Vec<&'static str>>);

    impl SceneEventHandler for Counter {
        fn on_event(&self, event: &SceneEvent) {
            self.0.lock().push(event.kind());
        }
    }

    fn closing() -> SceneEvent {
        SceneEvent::PresenceClosing {
            presence: Arc::new(PresenceSnapshot::new(EntityId(1), Vec3::ZERO, 64.0)),
        }
    }

    #[test]
    fn test_publish_and_unsubscribe() {
        let bus = EventBus::new();
        let counter = Arc::new(Counter::default());
        let id = bus.subscribe(counter.clone());

        bus.publish(&closing());
        assert_eq!(*counter.0.lock(), vec!["presence_closing"]);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&closing());
        assert_eq!(counter.0.lock().len(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
