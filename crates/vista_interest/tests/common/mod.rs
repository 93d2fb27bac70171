//! Shared fixture for viewer integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vista_core::{EntityId, GroupSnapshot, PartSnapshot, PresenceSnapshot, UpdateFlags, Vec3};
use vista_interest::{
    EventBus, InterestConfig, MockWorld, RecordingTransport, SceneEvent, SceneViewer, TickReport,
    Transport, WorkerPool,
};

/// The viewer's own presence.
pub const VIEWER: EntityId = EntityId(1);

/// Test config: no warm-up, short debounce.
pub fn config() -> InterestConfig {
    InterestConfig { warmup_ticks: 0, debounce_ms: 50, ..Default::default() }
}

/// Polls `condition` until it holds or five seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// A single-part group.
pub fn single(group: u64, x: f32) -> GroupSnapshot {
    GroupSnapshot::single(EntityId(group), EntityId(group + 1), Vec3::new(x, 0.0, 0.0))
}

/// A group whose only child sits between the viewer and the root.
pub fn linked(group: u64, x: f32) -> GroupSnapshot {
    let g = EntityId(group);
    GroupSnapshot::new(
        g,
        Vec3::new(x, 0.0, 0.0),
        3.0,
        vec![
            PartSnapshot::child(EntityId(group + 2), g, Vec3::new(x - 2.5, 0.0, 0.0)),
            PartSnapshot::root(EntityId(group + 1), g, Vec3::new(x, 0.0, 0.0)),
        ],
    )
}

/// One viewer wired to an in-memory world, a recorder and an event bus.
pub struct Harness {
    /// Scene contents.
    pub world: Arc<MockWorld>,
    /// Everything delivered to the viewer.
    pub transport: Arc<RecordingTransport>,
    /// Scene event source.
    pub bus: Arc<EventBus>,
    /// Scan workers.
    pub pool: Arc<WorkerPool>,
    /// Viewer under test.
    pub viewer: SceneViewer,
}

impl Harness {
    /// Viewer at the origin with a 32m draw distance.
    pub fn new(config: InterestConfig) -> Self {
        Self::with_viewer(PresenceSnapshot::new(VIEWER, Vec3::ZERO, 32.0), config)
    }

    /// Viewer built from `presence`.
    pub fn with_viewer(presence: PresenceSnapshot, config: InterestConfig) -> Self {
        let world = Arc::new(MockWorld::default());
        world.insert_presence(presence);
        let transport = Arc::new(RecordingTransport::new());
        Self::build(world, transport.clone(), transport, config)
    }

    /// Same fixture, but deliveries go through `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>, config: InterestConfig) -> Self {
        let world = Arc::new(MockWorld::default());
        world.insert_presence(PresenceSnapshot::new(VIEWER, Vec3::ZERO, 32.0));
        Self::build(world, Arc::new(RecordingTransport::new()), transport, config)
    }

    fn build(
        world: Arc<MockWorld>,
        recorder: Arc<RecordingTransport>,
        transport: Arc<dyn Transport>,
        config: InterestConfig,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let pool = Arc::new(WorkerPool::new(2, 64).unwrap());
        let viewer = SceneViewer::new(
            VIEWER,
            config,
            world.clone(),
            transport,
            bus.clone(),
            pool.clone(),
        )
        .unwrap();
        Self { world, transport: recorder, bus, pool, viewer }
    }

    /// Runs a zero-budget first tick and waits for the initial scan to
    /// land. Everything the scan queued is still pending afterwards.
    pub fn start(&self) {
        let report = self.viewer.tick(0, 0);
        assert!(!report.is_skipped(), "first tick skipped: {report:?}");
        assert!(wait_until(|| self.viewer.stats().scans_completed >= 1));
    }

    /// Tick with budgets large enough to drain everything.
    pub fn tick(&self) -> TickReport {
        self.viewer.tick(1_000, 1_000)
    }

    /// Adds a group to the world and announces it.
    pub fn spawn(&self, group: GroupSnapshot) -> Arc<GroupSnapshot> {
        let group = self.world.insert_group(group);
        for part in &group.parts {
            self.bus.publish(&SceneEvent::EntityChanged {
                part: Arc::clone(part),
                flags: UpdateFlags::forced_full(),
            });
        }
        group
    }

    /// Moves a group and announces the root's new position.
    pub fn move_group(&self, group: EntityId, x: f32) -> Arc<GroupSnapshot> {
        let moved = self.world.move_group(group, Vec3::new(x, 0.0, 0.0)).unwrap();
        self.bus.publish(&SceneEvent::EntityChanged {
            part: Arc::clone(moved.root().unwrap()),
            flags: UpdateFlags::POSITION,
        });
        moved
    }

    /// Moves a presence and announces it.
    pub fn move_presence(&self, id: EntityId, to: Vec3) -> Arc<PresenceSnapshot> {
        let presence = self
            .world
            .update_presence(id, |p| {
                p.position = to;
                p.camera_position = to;
            })
            .unwrap();
        self.bus.publish(&SceneEvent::PresenceMoved {
            presence: Arc::clone(&presence),
            flags: UpdateFlags::POSITION,
        });
        presence
    }
}
