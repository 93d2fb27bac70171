//! Scene event subscription for one viewer.

use std::sync::{Arc, Weak};

use super::state::ViewerInner;
use crate::integration::{SceneEvent, SceneEventHandler};

/// Routes scene events into the viewer's enqueue paths. Holds the viewer
/// weakly so a forgotten subscription never keeps it alive.
pub(crate) struct ViewerEventHandler {
    pub(crate) inner: Weak<ViewerInner>,
}

impl SceneEventHandler for ViewerEventHandler {
    fn on_event(&self, event: &SceneEvent) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if inner.ensure_open().is_err() {
            return;
        }
        let result = match event {
            SceneEvent::EntityChanged { part, flags } => {
                inner.queue_entity_update(Arc::clone(part), *flags)
            }
            SceneEvent::PropertiesChanged { updates } => {
                inner.queue_properties_update(updates.clone())
            }
            SceneEvent::PresenceMoved { presence, flags } => {
                let queued = inner.queue_presence_update(Arc::clone(presence), *flags);
                if presence.id == inner.viewer_id {
                    if let Err(err) = inner.significant_movement() {
                        inner.report("significant_movement", &err);
                    }
                }
                queued
            }
            SceneEvent::PresenceAnimated { presence, animations } => {
                inner.queue_animation_update(Arc::clone(presence), animations.clone())
            }
            SceneEvent::PresenceClosing { presence } | SceneEvent::MadeChildAgent { presence } => {
                inner.remove_from_view(presence.id);
                Ok(())
            }
            SceneEvent::DrawDistanceChanged { presence } | SceneEvent::CameraChanged { presence } => {
                if presence.id == inner.viewer_id {
                    inner.request_recompute();
                }
                Ok(())
            }
        };
        if let Err(err) = result {
            inner.report(event.kind(), &err);
        }
    }
}
