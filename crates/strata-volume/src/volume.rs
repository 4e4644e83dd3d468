//! The volume: a sparse chunk lattice with streaming, generation, meshing,
//! and persistence orchestration.
//!
//! One synchronous [`tick`](Volume::tick) per frame drives everything. Voxel
//! generation and mesh builds run on worker pools and are never awaited;
//! the tick polls chunk flags, drains finished results, and re-dispatches.
//! Chunks leaving the streaming radius are pooled and re-initialized in
//! place instead of dropped, and mesh buffers are recycled the same way.

use std::collections::VecDeque;
use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;

use strata_mesh::{
    BlockMeshRegistry, ChunkMeshes, MeshJob, MeshPipeline, VoxelNeighborhood, run_mesh_job,
};
use strata_voxel::{
    BuildStatus, ChangesReceiver, Chunk, ChunkKey, ChunkMap, ChunkProcessor, EditEventBuffer,
    ProcessingSchedule, ProcessorContext, SolidGenerator, Voxel, VoxelDataGenerator,
    VoxelDataPersister, VoxelEditEvent,
};

use crate::config::{InfiniteConfig, StreamingMode, VolumeConfig};
use crate::generation::{GenerationJob, GenerationPipeline};

/// Safety cap for finite-mode flood fill: content reaching this many shells
/// out is treated as unbounded and generation stops with a warning.
const FINITE_SHELL_LIMIT: i32 = 64;

/// A chunked, streaming voxel volume.
pub struct Volume {
    config: VolumeConfig,
    chunks: ChunkMap,
    meshes: FxHashMap<ChunkKey, ChunkMeshes>,
    pending_meshes: FxHashMap<ChunkKey, ChunkMeshes>,
    free_chunks: VecDeque<Chunk>,
    buffer_pool: Vec<ChunkMeshes>,
    generator: Arc<dyn VoxelDataGenerator>,
    persister: Option<Arc<dyn VoxelDataPersister>>,
    changes_rx: Option<ChangesReceiver>,
    processors: Vec<Box<dyn ChunkProcessor>>,
    registry: Arc<BlockMeshRegistry>,
    generation: GenerationPipeline,
    meshing: MeshPipeline,
    events: EditEventBuffer,
    observer: Vec3,
    last_observer_chunk: Option<ChunkKey>,
    infinite_timer: f32,
    first_pass: bool,
    data_pass: bool,
    slice: u32,
    stable_sweeps: u32,
    finite_next_shell: Option<i32>,
}

impl Volume {
    /// Creates a volume with the default solid generator and no persister.
    pub fn new(config: VolumeConfig) -> Self {
        let finite_next_shell = match config.streaming {
            StreamingMode::Finite => Some(0),
            StreamingMode::Infinite(_) => None,
        };
        Self {
            config,
            chunks: ChunkMap::default(),
            meshes: FxHashMap::default(),
            pending_meshes: FxHashMap::default(),
            free_chunks: VecDeque::new(),
            buffer_pool: Vec::new(),
            generator: Arc::new(SolidGenerator::default()),
            persister: None,
            changes_rx: None,
            processors: Vec::new(),
            registry: Arc::new(BlockMeshRegistry::new()),
            generation: GenerationPipeline::with_defaults(),
            meshing: MeshPipeline::new((num_cpus::get().max(2) - 1).max(1), 64),
            events: EditEventBuffer::new(),
            observer: Vec3::ZERO,
            last_observer_chunk: None,
            infinite_timer: 0.0,
            first_pass: true,
            data_pass: true,
            slice: 0,
            stable_sweeps: 0,
            finite_next_shell,
        }
    }

    // -- bindings ----------------------------------------------------------

    /// Binds the voxel data generator. One instance per volume.
    pub fn bind_generator(&mut self, generator: Arc<dyn VoxelDataGenerator>) {
        self.generator = generator;
    }

    /// Binds the persister together with its delta delivery channel.
    pub fn bind_persister(
        &mut self,
        persister: Arc<dyn VoxelDataPersister>,
        delivery: ChangesReceiver,
    ) {
        self.persister = Some(persister);
        self.changes_rx = Some(delivery);
    }

    /// Appends a chunk processor; processors run ordered by
    /// [`ChunkProcessor::order`] within each schedule point.
    pub fn add_processor(&mut self, processor: Box<dyn ChunkProcessor>) {
        self.processors.push(processor);
    }

    /// Installs the custom-block mesh registry.
    pub fn set_block_registry(&mut self, registry: BlockMeshRegistry) {
        self.registry = Arc::new(registry);
    }

    // -- accessors ---------------------------------------------------------

    /// This volume's configuration.
    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Stable identifier used as the persistence key prefix.
    pub fn identifier(&self) -> &str {
        &self.config.identifier
    }

    /// `true` once the bound generator can be sampled.
    pub fn is_data_ready(&self) -> bool {
        self.generator.is_ready()
    }

    /// O(1) sparse lookup; never creates.
    pub fn chunk_at(&self, position: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&position)
    }

    /// Mutable chunk lookup for hosts and tools.
    pub fn chunk_at_mut(&mut self, position: ChunkKey) -> Option<&mut Chunk> {
        self.chunks.get_mut(&position)
    }

    /// The applied render/collision buffers for a chunk, if any.
    pub fn mesh_at(&self, position: ChunkKey) -> Option<&ChunkMeshes> {
        self.meshes.get(&position)
    }

    /// Number of streamed-in chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Positions of all streamed-in chunks.
    pub fn chunk_positions(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks.keys().copied()
    }

    /// Number of retired chunks waiting in the reuse pool.
    pub fn pooled_count(&self) -> usize {
        self.free_chunks.len()
    }

    /// Edit events readable by the host this frame and the next.
    pub fn edit_events(&self) -> impl Iterator<Item = &VoxelEditEvent> {
        self.events.read()
    }

    /// Moves the observation point the infinite streaming sweep tracks.
    pub fn set_observer(&mut self, world: Vec3) {
        self.observer = world;
    }

    // -- per-frame orchestration -------------------------------------------

    /// Runs one frame of volume bookkeeping.
    pub fn tick(&mut self, dt: f32) {
        self.events.swap();
        self.drain_persisted_changes();
        self.drain_generated();
        self.drain_meshes();

        let keys: Vec<ChunkKey> = self.chunks.keys().copied().collect();
        for &key in &keys {
            self.run_processors(ProcessingSchedule::OnTick, key);
        }
        for &key in &keys {
            self.check_generation(key);
            self.check_persist(key, dt);
        }

        match self.config.streaming.clone() {
            StreamingMode::Finite => self.step_finite(),
            StreamingMode::Infinite(infinite) => self.step_infinite(dt, &infinite),
        }
    }

    /// Marks every chunk mesh-dirty, forcing a full rebuild.
    pub fn regenerate_meshes(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.set_mesh_dirty(true);
        }
    }

    fn drain_persisted_changes(&mut self) {
        let mut delivered = Vec::new();
        if let Some(rx) = &self.changes_rx {
            while let Ok(changes) = rx.try_recv() {
                delivered.push(changes);
            }
        }
        for changes in delivered {
            if changes.volume_id != self.config.identifier {
                continue;
            }
            if let Some(chunk) = self.chunks.get_mut(&changes.position) {
                chunk.load_changes(&changes.data);
            }
        }
    }

    fn drain_generated(&mut self) {
        for result in self.generation.drain_results() {
            let position = result.position;
            {
                let Some(chunk) = self.chunks.get_mut(&position) else {
                    continue;
                };
                if !chunk.is_generating() {
                    continue;
                }
                chunk.apply_generated(result.voxels, result.any_active);
            }
            self.run_processors(ProcessingSchedule::AfterGeneration, position);
            if let Some(chunk) = self.chunks.get_mut(&position) {
                chunk.set_needs_delta_load(true);
                if chunk.has_data() {
                    chunk.set_mesh_dirty(true);
                } else {
                    chunk.set_visible(false);
                }
            }
        }
    }

    fn drain_meshes(&mut self) {
        for result in self.meshing.drain_results() {
            let fresh = match self.chunks.get_mut(&result.position) {
                Some(chunk) if chunk.mesh_revision() == result.revision => {
                    chunk.set_build_status(BuildStatus::Ready);
                    true
                }
                // Stale build: an edit rebuild or a recycled chunk overtook
                // it. The Building latch, if set, belongs to the newer
                // dispatch still in flight, so only the buffers are dropped.
                Some(_) => false,
                None => false,
            };
            if fresh {
                if let Some(old) = self.pending_meshes.insert(result.position, result.meshes) {
                    self.recycle(old);
                }
            } else {
                self.recycle(result.meshes);
            }
        }
    }

    /// Runs the per-chunk generation/meshing state machine for one chunk.
    fn check_generation(&mut self, key: ChunkKey) {
        // Data pass: dirty contents are regenerated off-thread.
        let generator_ready = self.generator.is_ready();
        let chunk_size = self.config.chunk_size;
        if let Some(chunk) = self.chunks.get_mut(&key) {
            if chunk.is_data_dirty() && !chunk.is_generating() && generator_ready {
                chunk.set_data_dirty(false);
                chunk.set_generating(true);
                let job = GenerationJob {
                    position: key,
                    chunk_size,
                    generator: Arc::clone(&self.generator),
                };
                if self.generation.submit(job).is_err() {
                    // Saturated pool is backpressure: retry next tick.
                    chunk.set_data_dirty(true);
                    chunk.set_generating(false);
                }
            }
        }

        self.request_delta_load(key);

        // Ready pass: apply finished geometry, or discard it if dirtiness
        // arrived mid-build and rebuild below.
        let mut apply = false;
        let mut discard = false;
        if let Some(chunk) = self.chunks.get_mut(&key) {
            if chunk.build_status() == BuildStatus::Ready {
                chunk.set_build_status(BuildStatus::NoChange);
                if chunk.is_mesh_dirty() {
                    discard = true;
                } else {
                    chunk.set_visible(chunk.has_data());
                    apply = true;
                }
            }
        }
        if apply {
            if let Some(meshes) = self.pending_meshes.remove(&key) {
                self.apply_mesh(key, meshes);
            }
        }
        if discard {
            if let Some(meshes) = self.pending_meshes.remove(&key) {
                self.recycle(meshes);
            }
        }

        // Mesh pass: dispatch a build for dirty geometry once the chunk is
        // idle. An empty chunk just drops its old mesh and hides.
        let Some(chunk) = self.chunks.get(&key) else {
            return;
        };
        if chunk.build_status() != BuildStatus::NoChange
            || !chunk.is_mesh_dirty()
            || chunk.is_generating()
        {
            return;
        }
        if !chunk.has_data() {
            if let Some(chunk) = self.chunks.get_mut(&key) {
                chunk.set_mesh_dirty(false);
                chunk.set_visible(false);
            }
            if let Some(old) = self.meshes.remove(&key) {
                self.recycle(old);
            }
            return;
        }
        self.dispatch_mesh(key);
    }

    fn dispatch_mesh(&mut self, key: ChunkKey) {
        self.run_processors(ProcessingSchedule::BeforeMeshing, key);
        let neighborhood = self.snapshot_neighborhood(key);
        let buffers = self.take_buffers();
        let Some(chunk) = self.chunks.get_mut(&key) else {
            return;
        };
        chunk.set_mesh_dirty(false);
        chunk.set_build_status(BuildStatus::Building);
        let revision = chunk.bump_mesh_revision();
        let job = MeshJob {
            position: key,
            revision,
            neighborhood,
            voxel_size: self.config.voxel_size,
            self_shade_intensity: self.config.self_shading_intensity,
            render_mode: self.config.meshing_mode,
            collider_mode: self.config.collider_mode,
            registry: Arc::clone(&self.registry),
            buffers,
        };
        if let Err(job) = self.meshing.submit(job) {
            self.recycle(job.buffers);
            if let Some(chunk) = self.chunks.get_mut(&key) {
                chunk.set_mesh_dirty(true);
                chunk.set_build_status(BuildStatus::NoChange);
            }
        }
    }

    /// Rebuilds one chunk synchronously on the main tick (edit path).
    fn rebuild_now(&mut self, key: ChunkKey) {
        self.run_processors(ProcessingSchedule::BeforeMeshing, key);

        // This rebuild supersedes any finished-but-unapplied async build.
        if let Some(stale) = self.pending_meshes.remove(&key) {
            self.recycle(stale);
        }

        let Some(chunk) = self.chunks.get(&key) else {
            return;
        };
        if !chunk.has_data() {
            if let Some(chunk) = self.chunks.get_mut(&key) {
                chunk.set_mesh_dirty(false);
                chunk.set_visible(false);
                chunk.bump_mesh_revision();
                chunk.set_build_status(BuildStatus::NoChange);
            }
            if let Some(old) = self.meshes.remove(&key) {
                self.recycle(old);
            }
            return;
        }

        let neighborhood = self.snapshot_neighborhood(key);
        let buffers = self.take_buffers();
        let Some(chunk) = self.chunks.get_mut(&key) else {
            return;
        };
        // Bumping the revision invalidates any in-flight async build; its
        // result will be discarded on arrival.
        let revision = chunk.bump_mesh_revision();
        chunk.set_mesh_dirty(false);
        chunk.set_build_status(BuildStatus::NoChange);
        chunk.set_visible(true);
        let job = MeshJob {
            position: key,
            revision,
            neighborhood,
            voxel_size: self.config.voxel_size,
            self_shade_intensity: self.config.self_shading_intensity,
            render_mode: self.config.meshing_mode,
            collider_mode: self.config.collider_mode,
            registry: Arc::clone(&self.registry),
            buffers,
        };
        let result = run_mesh_job(job);
        self.apply_mesh(key, result.meshes);
    }

    fn run_processors(&mut self, schedule: ProcessingSchedule, target: ChunkKey) {
        if self.processors.is_empty() || !self.chunks.contains_key(&target) {
            return;
        }
        let mut indices: Vec<usize> = (0..self.processors.len())
            .filter(|&i| self.processors[i].schedule() == schedule)
            .collect();
        indices.sort_by_key(|&i| self.processors[i].order());

        for i in indices {
            let processor = &self.processors[i];
            let mut ctx = ProcessorContext::new(&mut self.chunks, target, self.config.chunk_size);
            if !processor.process(&mut ctx) {
                tracing::warn!(?target, ?schedule, "chunk processor reported failure");
            }
        }
    }

    fn request_delta_load(&mut self, key: ChunkKey) {
        let pending = self
            .chunks
            .get(&key)
            .map(|c| c.needs_delta_load())
            .unwrap_or(false);
        if !pending {
            return;
        }
        let done = match &self.persister {
            None => true,
            Some(persister) if persister.is_ready() => {
                persister.load_chunk(&self.config.identifier, key)
            }
            // Not ready yet: poll again next tick.
            Some(_) => false,
        };
        if done {
            if let Some(chunk) = self.chunks.get_mut(&key) {
                chunk.set_needs_delta_load(false);
            }
        }
    }

    fn check_persist(&mut self, key: ChunkKey, dt: f32) {
        let interval = self.config.persist_interval;
        let Some(chunk) = self.chunks.get_mut(&key) else {
            return;
        };
        if !chunk.tick_persist(dt) {
            return;
        }
        match &self.persister {
            None => {}
            Some(persister) if persister.is_ready() => {
                let data = chunk.encode_changes();
                if !persister.save_chunk(&self.config.identifier, key, &data) {
                    // The change log is intact; the next persisting edit
                    // re-arms the timer and retries.
                    tracing::warn!(?key, "chunk delta save failed");
                }
            }
            Some(_) => {
                // Persister not ready: re-arm and retry a full interval later.
                chunk.arm_persist_timer(interval);
            }
        }
    }

    // -- edits -------------------------------------------------------------

    /// Writes a voxel at a chunk-local coordinate.
    ///
    /// Records the edit in the change log, raises an edit event, rebuilds the
    /// chunk's mesh synchronously, and marks face-sharing neighbors
    /// mesh-dirty. With `persist`, the chunk's delta flush timer is (re)armed.
    /// Returns the written voxel, or `None` if the chunk is absent or the
    /// coordinate out of bounds.
    pub fn set_voxel(
        &mut self,
        position: ChunkKey,
        local: (i32, i32, i32),
        voxel: Voxel,
        persist: bool,
    ) -> Option<Voxel> {
        let interval = self.config.persist_interval;
        let written = {
            let chunk = self.chunks.get_mut(&position)?;
            let written = chunk.set_voxel(local, voxel)?;
            if persist {
                chunk.arm_persist_timer(interval);
            }
            written
        };

        let world = self.voxel_world_position(position, local);
        self.events.send(VoxelEditEvent {
            volume_id: self.config.identifier.clone(),
            chunk: position,
            voxel: local,
            state: written.state,
            value: written.value,
            color: written.color,
            world_position: world.to_array(),
        });

        self.rebuild_now(position);

        // Invalidate neighbors that can see this voxel across a shared
        // boundary: every displaced axis must sit on its face.
        let size = self.config.chunk_size as i32;
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let on_face = |offset: i32, coord: i32| match offset {
                        -1 => coord == 0,
                        1 => coord == size - 1,
                        _ => true,
                    };
                    if !on_face(dx, local.0) || !on_face(dy, local.1) || !on_face(dz, local.2) {
                        continue;
                    }
                    let neighbor = (position.0 + dx, position.1 + dy, position.2 + dz);
                    if let Some(chunk) = self.chunks.get_mut(&neighbor) {
                        chunk.set_mesh_dirty(true);
                    }
                }
            }
        }

        Some(written)
    }

    /// Resolves a world position to its voxel, owning chunk, and local
    /// coordinate. Absent if no chunk is streamed in there.
    pub fn voxel_at_world_position(
        &self,
        world: Vec3,
    ) -> Option<(Voxel, ChunkKey, (i32, i32, i32))> {
        let (position, local) = self.split_world(world);
        let voxel = self.chunks.get(&position)?.voxel_at(local)?;
        Some((voxel, position, local))
    }

    /// Writes a voxel at a world position; see [`Volume::set_voxel`].
    pub fn set_voxel_at_world_position(
        &mut self,
        world: Vec3,
        voxel: Voxel,
        persist: bool,
    ) -> Option<Voxel> {
        let (position, local) = self.split_world(world);
        self.set_voxel(position, local, voxel, persist)
    }

    /// Requests a persisted-delta load for one chunk.
    ///
    /// Fails gracefully (returns `false`) while the persister is absent or
    /// not ready; the chunk's pending-load flag retries on its own.
    pub fn load_chunk_changes(&mut self, position: ChunkKey) -> bool {
        match &self.persister {
            Some(persister) if persister.is_ready() => {
                persister.load_chunk(&self.config.identifier, position)
            }
            _ => false,
        }
    }

    /// Flushes one chunk's change log to the persister immediately.
    pub fn save_chunk_changes(&mut self, position: ChunkKey) -> bool {
        let Some(chunk) = self.chunks.get(&position) else {
            return false;
        };
        match &self.persister {
            Some(persister) if persister.is_ready() => {
                let data = chunk.encode_changes();
                persister.save_chunk(&self.config.identifier, position, &data)
            }
            _ => false,
        }
    }

    // -- coordinate conversions --------------------------------------------

    fn split_world(&self, world: Vec3) -> (ChunkKey, (i32, i32, i32)) {
        let size = self.config.chunk_size as i32;
        let voxel = (
            (world.x / self.config.voxel_size).floor() as i32,
            (world.y / self.config.voxel_size).floor() as i32,
            (world.z / self.config.voxel_size).floor() as i32,
        );
        let position = (
            voxel.0.div_euclid(size),
            voxel.1.div_euclid(size),
            voxel.2.div_euclid(size),
        );
        let local = (
            voxel.0.rem_euclid(size),
            voxel.1.rem_euclid(size),
            voxel.2.rem_euclid(size),
        );
        (position, local)
    }

    /// World position of a voxel's center.
    pub fn voxel_world_position(&self, position: ChunkKey, local: (i32, i32, i32)) -> Vec3 {
        let size = self.config.chunk_size as i32;
        Vec3::new(
            (position.0 * size + local.0) as f32 + 0.5,
            (position.1 * size + local.1) as f32 + 0.5,
            (position.2 * size + local.2) as f32 + 0.5,
        ) * self.config.voxel_size
    }

    // -- chunk and buffer pooling ------------------------------------------

    fn allocate_chunk(&mut self, position: ChunkKey) {
        let chunk = match self.free_chunks.pop_front() {
            Some(mut reused) => {
                reused.initialize(position);
                reused
            }
            None => Chunk::new(position, self.config.chunk_size),
        };
        self.chunks.insert(position, chunk);
    }

    fn retire_chunk(&mut self, position: ChunkKey) {
        if let Some(chunk) = self.chunks.remove(&position) {
            self.free_chunks.push_back(chunk);
        }
        if let Some(meshes) = self.meshes.remove(&position) {
            self.recycle(meshes);
        }
        if let Some(meshes) = self.pending_meshes.remove(&position) {
            self.recycle(meshes);
        }
    }

    fn snapshot_neighborhood(&self, key: ChunkKey) -> VoxelNeighborhood {
        let mut neighborhood = VoxelNeighborhood::new(self.config.chunk_size);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let position = (key.0 + dx, key.1 + dy, key.2 + dz);
                    if let Some(chunk) = self.chunks.get(&position) {
                        neighborhood.set((dx, dy, dz), chunk.snapshot());
                    }
                }
            }
        }
        neighborhood
    }

    fn take_buffers(&mut self) -> ChunkMeshes {
        self.buffer_pool.pop().unwrap_or_default()
    }

    fn recycle(&mut self, mut meshes: ChunkMeshes) {
        meshes.clear();
        self.buffer_pool.push(meshes);
    }

    fn apply_mesh(&mut self, key: ChunkKey, meshes: ChunkMeshes) {
        if let Some(old) = self.meshes.insert(key, meshes) {
            self.recycle(old);
        }
    }

    // -- finite streaming --------------------------------------------------

    fn step_finite(&mut self) {
        let Some(shell) = self.finite_next_shell else {
            return;
        };
        if !self.generator.is_ready() {
            return;
        }

        let mut any_content = false;
        for cell in shell_cells(shell) {
            if self.probe_cell(cell) {
                any_content = true;
                if !self.chunks.contains_key(&cell) {
                    self.allocate_chunk(cell);
                }
            }
        }

        // The origin cell alone being empty says nothing about content one
        // shell further out (e.g. terrain entirely below y = 0).
        if (!any_content && shell > 0) || shell >= FINITE_SHELL_LIMIT {
            if shell >= FINITE_SHELL_LIMIT {
                tracing::warn!(shell, "finite flood fill stopped at shell limit");
            }
            self.finite_next_shell = None;
        } else {
            self.finite_next_shell = Some(shell + 1);
        }
    }

    /// `true` if any voxel in the chunk cell would generate active.
    fn probe_cell(&self, cell: ChunkKey) -> bool {
        let size = self.config.chunk_size as i32;
        let base = (cell.0 * size, cell.1 * size, cell.2 * size);
        for z in 0..size {
            for y in 0..size {
                for x in 0..size {
                    if self
                        .generator
                        .generate_voxel(base.0 + x, base.1 + y, base.2 + z)
                        .is_active()
                    {
                        return true;
                    }
                }
            }
        }
        false
    }

    // -- infinite streaming ------------------------------------------------

    fn step_infinite(&mut self, dt: f32, config: &InfiniteConfig) {
        self.infinite_timer += dt;
        if self.infinite_timer < config.update_interval {
            return;
        }
        self.infinite_timer = 0.0;

        let span = self.config.chunk_size as f32 * self.config.voxel_size;
        let center = (
            (self.observer.x / span).floor() as i32,
            (self.observer.y / span).floor() as i32,
            (self.observer.z / span).floor() as i32,
        );

        // A jump of more than one chunk restarts the sweep from scratch.
        match self.last_observer_chunk {
            Some(last) => {
                let moved = (last.0 - center.0)
                    .abs()
                    .max((last.1 - center.1).abs())
                    .max((last.2 - center.2).abs());
                if moved > 1 {
                    tracing::debug!(?center, "observer jumped, restarting streaming sweep");
                    self.first_pass = true;
                    self.slice = 0;
                    self.stable_sweeps = 0;
                } else if moved == 0 {
                    self.stable_sweeps = self.stable_sweeps.saturating_add(1);
                } else {
                    self.stable_sweeps = 0;
                }
            }
            None => self.first_pass = true,
        }
        self.last_observer_chunk = Some(center);

        let radius = config.radius.max(0);
        let radius_sq = radius * radius;

        // Retire everything that fell outside the radius into the pool.
        let retire: Vec<ChunkKey> = self
            .chunks
            .keys()
            .filter(|key| distance_sq(**key, center) > radius_sq)
            .copied()
            .collect();
        for key in retire {
            self.retire_chunk(key);
        }

        let inner = (radius - config.update_margin).max(0);
        let inner_sq = inner * inner;
        let slices = config.slices.max(1);
        // The central margin counts as fresh once a stationary observer has
        // seen a full slice rotation.
        let margin_fresh = self.stable_sweeps >= slices;

        if self.first_pass {
            // Full-radius data pass, ignoring slices and margin.
            for cell in cube_cells(center, radius) {
                if !self.cell_in_bounds(cell, config) || distance_sq(cell, center) > radius_sq {
                    continue;
                }
                if !self.chunks.contains_key(&cell) {
                    self.allocate_chunk(cell);
                }
            }
            self.first_pass = false;
            self.data_pass = false;
        } else if self.data_pass {
            // Stream in missing chunks for this slice.
            for cell in cube_cells(center, radius) {
                if !self.cell_in_bounds(cell, config) {
                    continue;
                }
                let dist_sq = distance_sq(cell, center);
                if dist_sq > radius_sq || slice_of(cell, slices) != self.slice {
                    continue;
                }
                if margin_fresh && dist_sq < inner_sq {
                    continue;
                }
                if !self.chunks.contains_key(&cell) {
                    self.allocate_chunk(cell);
                }
            }
            self.data_pass = false;
        } else {
            // Remesh pass: refresh the outer band left behind by movement.
            // Once the observer has been still for a full rotation there is
            // nothing stale to refresh.
            if !margin_fresh {
                for cell in cube_cells(center, radius) {
                    let dist_sq = distance_sq(cell, center);
                    if dist_sq > radius_sq
                        || dist_sq < inner_sq
                        || slice_of(cell, slices) != self.slice
                    {
                        continue;
                    }
                    if let Some(chunk) = self.chunks.get_mut(&cell) {
                        chunk.set_mesh_dirty(true);
                    }
                }
            }
            self.data_pass = true;
            self.slice = (self.slice + 1) % slices;
        }
    }

    fn cell_in_bounds(&self, cell: ChunkKey, config: &InfiniteConfig) -> bool {
        let (bx, by, bz) = config.bounds;
        (bx <= 0 || cell.0.abs() <= bx)
            && (by <= 0 || cell.1.abs() <= by)
            && (bz <= 0 || cell.2.abs() <= bz)
    }
}

/// Squared chunk-lattice distance.
fn distance_sq(a: ChunkKey, b: ChunkKey) -> i32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    let dz = a.2 - b.2;
    dx * dx + dy * dy + dz * dz
}

/// Round-robin slice a cell belongs to.
fn slice_of(cell: ChunkKey, slices: u32) -> u32 {
    let hash = (cell.0.wrapping_mul(73_856_093))
        ^ (cell.1.wrapping_mul(19_349_663))
        ^ (cell.2.wrapping_mul(83_492_791));
    hash.rem_euclid(slices as i32) as u32
}

/// All cells of the cubic shell with Chebyshev radius `r` around the origin.
fn shell_cells(r: i32) -> Vec<ChunkKey> {
    let mut cells = Vec::new();
    for z in -r..=r {
        for y in -r..=r {
            for x in -r..=r {
                if x.abs().max(y.abs()).max(z.abs()) == r {
                    cells.push((x, y, z));
                }
            }
        }
    }
    cells
}

/// All cells of the filled cube with Chebyshev radius `r` around `center`.
fn cube_cells(center: ChunkKey, r: i32) -> impl Iterator<Item = ChunkKey> {
    let (cx, cy, cz) = center;
    (-r..=r).flat_map(move |z| {
        (-r..=r).flat_map(move |y| (-r..=r).map(move |x| (cx + x, cy + y, cz + z)))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
