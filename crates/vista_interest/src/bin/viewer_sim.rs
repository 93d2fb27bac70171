//! # Viewer Simulation
//!
//! Drives a crowd of viewers through a busy in-memory region:
//! - wandering presences, each with its own scene viewer
//! - drifting groups with occasional property edits
//! - randomly changing draw distances
//!
//! Prints per-tick cost and delivery counters, then checks that every
//! identity each viewer heard about arrived as a full update first.
//!
//! Usage: `viewer_sim [config.toml]`. Logging follows `RUST_LOG`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;
use vista_core::{
    EntityId, GroupSnapshot, PartSnapshot, PresenceSnapshot, PropertyFlags, RegionInfo,
    UpdateFlags, Vec3,
};
use vista_interest::{
    EventBus, InterestConfig, InterestResult, MockWorld, Observed, PropertiesUpdate,
    RecordingTransport, SceneEvent, SceneViewer, Sent, WorkerPool, DEFAULT_PRESENCE_BUDGET,
    DEFAULT_PRIM_BUDGET,
};

const VIEWERS: u64 = 24;
const GROUPS: u64 = 2_000;
const TICKS: u64 = 600;
const MOVES_PER_TICK: usize = 40;
const SEED: u64 = 0x5EED;

struct Client {
    id: EntityId,
    viewer: SceneViewer,
    transport: Arc<RecordingTransport>,
}

fn random_point(rng: &mut ChaCha8Rng) -> Vec3 {
    Vec3::new(rng.gen_range(0.0..256.0), rng.gen_range(0.0..256.0), 22.0)
}

fn build_group(rng: &mut ChaCha8Rng, index: u64) -> GroupSnapshot {
    let id = EntityId(10_000 + index * 8);
    let at = random_point(rng);
    let children = rng.gen_range(0..4_u64);
    let mut parts = vec![PartSnapshot::root(EntityId(id.0 + 1), id, at)];
    for c in 0..children {
        let offset = Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), 0.0);
        parts.push(PartSnapshot::child(EntityId(id.0 + 2 + c), id, at + offset));
    }
    GroupSnapshot::new(id, at, 2.5, parts)
}

/// Ids that reached this client with a delta before any full update.
fn delta_first(transport: &RecordingTransport) -> usize {
    let mut seen = HashSet::new();
    for call in transport.sent() {
        match call {
            Sent::Full(id) => {
                seen.insert(id);
            }
            Sent::Delta(batch) => {
                for (id, _) in batch {
                    seen.insert(id);
                }
            }
            Sent::Animations(_) | Sent::Properties(_) => {}
        }
    }
    seen.into_iter()
        .filter(|id| transport.history_for(*id).first() != Some(&Observed::Full))
        .count()
}

fn main() -> InterestResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let demo = InterestConfig { warmup_ticks: 5, debounce_ms: 200, ..Default::default() };
    let config = match std::env::args().nth(1) {
        Some(path) => InterestConfig::from_toml_file(&path).unwrap_or_else(|err| {
            tracing::warn!(path = %path, error = %err, "config unusable, using defaults");
            demo
        }),
        None => demo,
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         VISTA - VIEWER INTEREST SIMULATION                       ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Viewers:            {VIEWERS}");
    println!("│ Groups:             {GROUPS}");
    println!("│ Ticks:              {TICKS}");
    println!("│ Prioritization:     {:?}", config.prioritization);
    println!("│ FOV Culling:        {}", config.fov_culling);
    println!("│ Budgets:            {DEFAULT_PRIM_BUDGET} prim / {DEFAULT_PRESENCE_BUDGET} presence");
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let world = Arc::new(MockWorld::new(RegionInfo::STANDARD));
    let bus = Arc::new(EventBus::new());
    let pool = Arc::new(WorkerPool::new(config.worker_threads, config.worker_queue)?);

    let group_ids: Vec<EntityId> = (0..GROUPS)
        .map(|i| world.insert_group(build_group(&mut rng, i)).id)
        .collect();

    let mut clients = Vec::with_capacity(VIEWERS as usize);
    for i in 0..VIEWERS {
        let id = EntityId(1 + i);
        let draw_distance = [32.0, 64.0, 128.0][rng.gen_range(0..3)];
        world.insert_presence(PresenceSnapshot::new(id, random_point(&mut rng), draw_distance));
        let transport = Arc::new(RecordingTransport::new());
        let viewer = SceneViewer::new(
            id,
            config.clone(),
            world.clone(),
            transport.clone(),
            bus.clone(),
            pool.clone(),
        )?;
        clients.push(Client { id, viewer, transport });
    }

    println!("Running...");
    let start = Instant::now();
    for tick in 0..TICKS {
        for client in &clients {
            let step = Vec3::new(rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5), 0.0);
            let moved = world.update_presence(client.id, |p| {
                p.velocity = step;
                p.position = p.position + step;
                p.camera_position = p.position;
                if let Some(axis) = step.try_normalize() {
                    p.camera_at_axis = axis;
                }
            });
            if let Some(presence) = moved {
                bus.publish(&SceneEvent::PresenceMoved { presence, flags: UpdateFlags::TERSE });
            }
        }

        for _ in 0..MOVES_PER_TICK {
            let id = group_ids[rng.gen_range(0..group_ids.len())];
            let Some(moved) = world.move_group(id, random_point(&mut rng)) else {
                continue;
            };
            if let Some(root) = moved.root() {
                bus.publish(&SceneEvent::EntityChanged {
                    part: Arc::clone(root),
                    flags: UpdateFlags::POSITION,
                });
            }
            if rng.gen_bool(0.1) {
                let updates = moved
                    .parts
                    .iter()
                    .map(|part| PropertiesUpdate::new(Arc::clone(part), PropertyFlags::NAME))
                    .collect();
                bus.publish(&SceneEvent::PropertiesChanged { updates });
            }
        }

        if tick % 50 == 0 {
            let client = &clients[rng.gen_range(0..clients.len())];
            let changed = world.update_presence(client.id, |p| {
                p.draw_distance = if p.draw_distance > 64.0 { 32.0 } else { 128.0 };
            });
            if let Some(presence) = changed {
                bus.publish(&SceneEvent::DrawDistanceChanged { presence });
            }
        }

        for client in &clients {
            client.viewer.tick(DEFAULT_PRIM_BUDGET, DEFAULT_PRESENCE_BUDGET);
        }
    }
    let elapsed = start.elapsed();

    for client in &clients {
        while client.viewer.pending_counts().total() > 0 {
            client.viewer.tick(DEFAULT_PRIM_BUDGET, DEFAULT_PRESENCE_BUDGET);
        }
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                    SIMULATION RESULTS                            ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let mut violations = 0;
    let mut totals = (0_u64, 0_u64, 0_u64, 0_u64);
    let mut worst_tick_us = 0;
    for client in &clients {
        let stats = client.viewer.stats();
        totals.0 += stats.records_sent();
        totals.1 += stats.scans_completed;
        totals.2 += stats.recomputes;
        totals.3 += stats.skipped_busy + stats.skipped_warmup;
        worst_tick_us = worst_tick_us.max(stats.max_tick_us);
        violations += delta_first(&client.transport);
    }

    println!("┌─ TIMING ────────────────────────────────────────────────────────┐");
    println!("│ Real Time:          {:.2} seconds", elapsed.as_secs_f64());
    println!("│ Viewer Ticks:       {}", TICKS * VIEWERS);
    println!("│ Worst Tick:         {worst_tick_us} μs");
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!("┌─ DELIVERY ──────────────────────────────────────────────────────┐");
    println!("│ Records Sent:       {}", totals.0);
    println!("│ Scans Completed:    {}", totals.1);
    println!("│ Recomputes:         {}", totals.2);
    println!("│ Skipped Ticks:      {}", totals.3);
    if violations == 0 {
        println!("│ Full Before Delta:  ✓ HELD FOR EVERY IDENTITY");
    } else {
        println!("│ Full Before Delta:  ✗ {violations} VIOLATIONS");
    }
    println!("└──────────────────────────────────────────────────────────────────┘");

    for client in &clients {
        client.viewer.close();
    }
    Ok(())
}
