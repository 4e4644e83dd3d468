//! End-to-end scenarios: streaming, edits, meshing, and persistence across
//! full volume ticks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glam::Vec3;
use strata_mesh::MeshingMode;
use strata_terrain::{TerrainGenerator, TreeProcessor};
use strata_volume::{InfiniteConfig, StreamingMode, Volume, VolumeConfig};
use strata_voxel::{
    ChunkProcessor, DiskPersister, ProcessingSchedule, ProcessorContext, Voxel,
    VoxelDataGenerator, changes_channel,
};

/// Activates every voxel below y = 0 only.
struct PlaneGenerator;

impl VoxelDataGenerator for PlaneGenerator {
    fn generate_voxel(&self, _x: i32, y: i32, _z: i32) -> Voxel {
        if y < 0 {
            Voxel::solid(1, [255; 4])
        } else {
            Voxel::EMPTY
        }
    }
}

/// Ticks until `done` returns true or the timeout elapses.
fn settle(volume: &mut Volume, dt: f32, mut done: impl FnMut(&Volume) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        volume.tick(dt);
        if done(volume) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

fn finite_config() -> VolumeConfig {
    VolumeConfig {
        identifier: "test".to_owned(),
        chunk_size: 16,
        ..Default::default()
    }
}

#[test]
fn test_finite_plane_world_settles_below_origin() {
    let mut volume = Volume::new(finite_config());
    volume.bind_generator(Arc::new(PlaneGenerator));

    // Let the flood fill walk a few shells and generation catch up.
    let generated = settle(&mut volume, 0.05, |v| {
        v.chunk_at((0, -1, 0))
            .map(|c| c.has_data() && !c.is_generating())
            .unwrap_or(false)
    });
    assert!(generated, "chunk below the plane never generated");

    // Content below the origin exists and is fully solid.
    let below = volume.chunk_at((0, -1, 0)).expect("chunk below plane");
    assert!(below.has_data());

    // Above the plane and at the (empty) origin cell nothing was created.
    assert!(volume.chunk_at((0, 1, 0)).is_none());
    assert!(volume.chunk_at((0, 0, 0)).is_none());
}

#[test]
fn test_edit_marks_exactly_the_face_sharing_neighbor() {
    let mut volume = Volume::new(finite_config());

    // Two finite shells: the origin chunk plus its 26 neighbors.
    volume.tick(0.05);
    volume.tick(0.05);
    assert!(volume.chunk_count() >= 27);

    let positions: Vec<_> = volume.chunk_positions().collect();
    for position in &positions {
        let chunk = volume.chunk_at_mut(*position).expect("present");
        chunk.set_mesh_dirty(false);
    }

    // Local (0, 3, 5) lies on the x = 0 face only.
    let written = volume.set_voxel((0, 0, 0), (0, 3, 5), Voxel::solid(7, [1, 2, 3, 255]), false);
    assert!(written.is_some());

    for position in positions {
        if position == (0, 0, 0) {
            continue;
        }
        let dirty = volume.chunk_at(position).expect("present").is_mesh_dirty();
        if position == (-1, 0, 0) {
            assert!(dirty, "face-sharing neighbor must be marked");
        } else {
            assert!(!dirty, "{position:?} must not be marked");
        }
    }
}

#[test]
fn test_edit_raises_event_and_survives_get() {
    let mut volume = Volume::new(finite_config());
    volume.tick(0.05);

    let voxel = Voxel::solid(9, [10, 20, 30, 255]);
    let world = Vec3::new(3.5, 2.5, 1.5);
    let written = volume.set_voxel_at_world_position(world, voxel, false);
    assert_eq!(written, Some(voxel));

    let (read, position, local) = volume.voxel_at_world_position(world).expect("resolves");
    assert_eq!(read, voxel);
    assert_eq!(position, (0, 0, 0));
    assert_eq!(local, (3, 2, 1));

    let events: Vec<_> = volume.edit_events().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].chunk, (0, 0, 0));
    assert_eq!(events[0].voxel, (3, 2, 1));
    assert_eq!(events[0].value, 9);
}

#[test]
fn test_negative_world_positions_resolve() {
    let mut volume = Volume::new(finite_config());
    volume.tick(0.05);
    volume.tick(0.05);

    let world = Vec3::new(-0.5, -0.5, -0.5);
    let (_, position, local) = volume.voxel_at_world_position(world).expect("resolves");
    assert_eq!(position, (-1, -1, -1));
    assert_eq!(local, (15, 15, 15));
}

#[test]
fn test_async_meshing_applies_and_shows_chunk() {
    // The plane world's surface chunk always has an exposed top face, so its
    // render mesh is non-empty no matter how neighbor generation interleaves.
    let mut volume = Volume::new(finite_config());
    volume.bind_generator(Arc::new(PlaneGenerator));

    let meshed = settle(&mut volume, 0.05, |v| {
        v.mesh_at((0, -1, 0))
            .map(|m| !m.render.is_empty())
            .unwrap_or(false)
    });
    assert!(meshed, "surface chunk never produced a render mesh");
    assert!(volume.chunk_at((0, -1, 0)).expect("present").is_visible());
    // No separate collider mode: the collider buffers stay empty.
    assert!(volume.mesh_at((0, -1, 0)).expect("meshed").collider.is_empty());
}

#[test]
fn test_separate_collider_mode_fills_collider_buffers() {
    let mut config = finite_config();
    config.collider_mode = Some(MeshingMode::Greedy);
    let mut volume = Volume::new(config);
    volume.bind_generator(Arc::new(PlaneGenerator));

    let meshed = settle(&mut volume, 0.05, |v| {
        v.mesh_at((0, -1, 0))
            .map(|m| !m.render.is_empty() && !m.collider.is_empty())
            .unwrap_or(false)
    });
    assert!(meshed, "collider mesh never built");
}

#[test]
fn test_infinite_streaming_invariant_and_pool_reuse() {
    let radius = 3;
    let mut config = finite_config();
    config.streaming = StreamingMode::Infinite(InfiniteConfig {
        radius,
        update_interval: 0.05,
        slices: 4,
        update_margin: 1,
        ..Default::default()
    });
    let mut volume = Volume::new(config);
    volume.set_observer(Vec3::ZERO);

    let expected: Vec<(i32, i32, i32)> = {
        let mut cells = Vec::new();
        for z in -radius..=radius {
            for y in -radius..=radius {
                for x in -radius..=radius {
                    if x * x + y * y + z * z <= radius * radius {
                        cells.push((x, y, z));
                    }
                }
            }
        }
        cells
    };

    // Several sweeps with a stationary observer.
    for _ in 0..10 {
        volume.tick(0.05);
    }

    for &cell in &expected {
        assert!(volume.chunk_at(cell).is_some(), "{cell:?} missing in radius");
    }
    assert_eq!(volume.chunk_count(), expected.len(), "stale chunks remain");

    // Jump ten chunks along +X: the sweep restarts around the new center.
    let span = 16.0;
    volume.set_observer(Vec3::new(10.0 * span, 0.0, 0.0));
    for _ in 0..10 {
        volume.tick(0.05);
    }

    for &(x, y, z) in &expected {
        let cell = (x + 10, y, z);
        assert!(volume.chunk_at(cell).is_some(), "{cell:?} missing after move");
    }
    assert_eq!(volume.chunk_count(), expected.len());
    assert!(volume.chunk_at((0, 0, 0)).is_none(), "old chunks not retired");
    // Every retired chunk was re-initialized for the new center.
    assert_eq!(volume.pooled_count(), 0, "pool should be drained by reuse");
}

#[test]
fn test_infinite_bounds_clamp_axes() {
    let mut config = finite_config();
    config.streaming = StreamingMode::Infinite(InfiniteConfig {
        radius: 3,
        bounds: (0, 1, 0),
        update_interval: 0.05,
        ..Default::default()
    });
    let mut volume = Volume::new(config);
    for _ in 0..6 {
        volume.tick(0.05);
    }

    assert!(volume.chunk_at((0, 1, 0)).is_some());
    assert!(volume.chunk_at((0, 2, 0)).is_none(), "y bound ignored");
    assert!(volume.chunk_at((2, 0, 0)).is_some(), "unbounded axis clamped");
}

#[test]
fn test_empty_chunks_are_suppressed() {
    let mut config = finite_config();
    config.streaming = StreamingMode::Infinite(InfiniteConfig {
        radius: 2,
        update_interval: 0.05,
        ..Default::default()
    });
    let mut volume = Volume::new(config);
    volume.bind_generator(Arc::new(PlaneGenerator));

    let settled = settle(&mut volume, 0.05, |v| {
        v.chunk_at((0, 1, 0))
            .map(|c| !c.is_data_dirty() && !c.is_generating())
            .unwrap_or(false)
    });
    assert!(settled, "chunk above the plane never generated");

    let above = volume.chunk_at((0, 1, 0)).expect("present");
    assert!(!above.has_data());
    assert!(!above.is_visible(), "empty chunk must stay hidden");
    assert!(volume.mesh_at((0, 1, 0)).is_none());
}

#[test]
fn test_persistence_roundtrip_across_volumes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let edit_a = Voxel::custom(42, 1, [200, 100, 50, 255]);
    let edit_b = Voxel::solid(17, [5, 6, 7, 255]);

    // First volume: edit two voxels and let the persist timer flush them.
    {
        let mut config = finite_config();
        config.identifier = "save-world".to_owned();
        config.persist_interval = 0.05;
        let mut volume = Volume::new(config);
        let (tx, rx) = changes_channel();
        let persister = DiskPersister::new(dir.path(), tx).expect("persister");
        volume.bind_persister(Arc::new(persister), rx);

        volume.tick(0.05);
        assert!(volume.set_voxel((0, 0, 0), (1, 2, 3), edit_a, true).is_some());
        assert!(volume.set_voxel((0, 0, 0), (4, 5, 6), edit_b, true).is_some());
        volume.tick(0.1);

        let saved: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .collect();
        assert!(!saved.is_empty(), "delta file never written");
    }

    // Second volume: generation completes, the delta reloads, edits match.
    let mut config = finite_config();
    config.identifier = "save-world".to_owned();
    let mut volume = Volume::new(config);
    let (tx, rx) = changes_channel();
    let persister = DiskPersister::new(dir.path(), tx).expect("persister");
    volume.bind_persister(Arc::new(persister), rx);

    let restored = settle(&mut volume, 0.01, |v| {
        v.chunk_at((0, 0, 0))
            .and_then(|c| c.voxel_at((1, 2, 3)))
            .map(|voxel| voxel == edit_a)
            .unwrap_or(false)
    });
    assert!(restored, "persisted edit never restored");

    let chunk = volume.chunk_at((0, 0, 0)).expect("present");
    assert_eq!(chunk.voxel_at((4, 5, 6)), Some(edit_b));
    // Everything else is generator output, untouched by the delta.
    let default = chunk.voxel_at((0, 0, 0)).expect("in bounds");
    assert!(default.is_active());
    assert_eq!(default.value, 0);
}

#[test]
fn test_terrain_world_with_tree_processor() {
    let mut config = finite_config();
    config.streaming = StreamingMode::Infinite(InfiniteConfig {
        radius: 2,
        update_interval: 0.05,
        ..Default::default()
    });
    let mut volume = Volume::new(config);
    volume.bind_generator(Arc::new(TerrainGenerator::new(42)));
    volume.add_processor(Box::new(TreeProcessor::default()));

    let settled = settle(&mut volume, 0.05, |v| {
        v.chunk_at((0, 0, 0))
            .map(|c| c.has_data() && !c.is_generating())
            .unwrap_or(false)
    });
    assert!(settled, "terrain chunk never generated");

    // The terrain floor starts above y = 4, so the chunk's bottom layer is
    // always solid ground.
    let chunk = volume.chunk_at((0, 0, 0)).expect("present");
    for x in 0..16 {
        for z in 0..16 {
            assert!(
                chunk.voxel_at((x, 0, z)).expect("in bounds").is_active(),
                "ground missing at ({x}, 0, {z})"
            );
        }
    }
}

#[test]
fn test_processors_run_at_their_schedule_points() {
    struct Counter {
        schedule: ProcessingSchedule,
        calls: Arc<AtomicUsize>,
    }
    impl ChunkProcessor for Counter {
        fn schedule(&self) -> ProcessingSchedule {
            self.schedule
        }
        fn process(&self, _ctx: &mut ProcessorContext<'_>) -> bool {
            self.calls.fetch_add(1, Ordering::Relaxed);
            true
        }
    }

    let after_generation = Arc::new(AtomicUsize::new(0));
    let on_tick = Arc::new(AtomicUsize::new(0));

    let mut volume = Volume::new(finite_config());
    volume.add_processor(Box::new(Counter {
        schedule: ProcessingSchedule::AfterGeneration,
        calls: Arc::clone(&after_generation),
    }));
    volume.add_processor(Box::new(Counter {
        schedule: ProcessingSchedule::OnTick,
        calls: Arc::clone(&on_tick),
    }));

    let settled = settle(&mut volume, 0.05, |v| {
        v.chunk_at((0, 0, 0))
            .map(|c| c.has_data() && !c.is_generating())
            .unwrap_or(false)
    });
    assert!(settled);

    assert!(after_generation.load(Ordering::Relaxed) >= 1);
    assert!(on_tick.load(Ordering::Relaxed) >= 1);
}
