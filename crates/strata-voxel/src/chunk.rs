//! Chunk data model: a cube of voxels with dirty tracking, a build-status
//! machine, and an edit change log.
//!
//! A [`Chunk`] owns `size³` voxels in a flat array behind a copy-on-write
//! [`Arc`], so in-flight worker tasks can hold cheap snapshots while the main
//! tick keeps editing. The chunk records every explicit edit in its change
//! log (the persistence delta) and carries the per-chunk flags the volume's
//! tick loop drives: `data_dirty`, `mesh_dirty`, the tri-state build status,
//! and the persist countdown.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::delta;
use crate::voxel::Voxel;

/// Chunk-lattice coordinate, used as the sparse map key.
pub type ChunkKey = (i32, i32, i32);

/// The sparse chunk lattice: only streamed-in chunks are present.
pub type ChunkMap = FxHashMap<ChunkKey, Chunk>;

/// Tri-state progress of an asynchronous mesh build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildStatus {
    /// No build in flight and nothing waiting to be applied.
    #[default]
    NoChange,
    /// A build task has been dispatched and has not finished.
    Building,
    /// A finished build is waiting to be applied or discarded.
    Ready,
}

/// A cube of `size³` voxels plus its streaming/meshing bookkeeping.
#[derive(Clone, Debug)]
pub struct Chunk {
    position: ChunkKey,
    size: usize,
    voxels: Arc<Vec<Voxel>>,
    data_dirty: bool,
    generating: bool,
    mesh_dirty: bool,
    status: BuildStatus,
    mesh_revision: u64,
    has_data: bool,
    visible: bool,
    needs_delta_load: bool,
    changes: FxHashMap<(i32, i32, i32), Voxel>,
    persist_timer: f32,
}

impl Chunk {
    /// Creates a fresh chunk at `position` with an all-empty voxel array.
    ///
    /// New chunks start data-dirty so the volume generates their contents on
    /// the next tick.
    pub fn new(position: ChunkKey, size: usize) -> Self {
        Self {
            position,
            size,
            voxels: Arc::new(vec![Voxel::EMPTY; size * size * size]),
            data_dirty: true,
            generating: false,
            mesh_dirty: false,
            status: BuildStatus::NoChange,
            mesh_revision: 0,
            has_data: false,
            visible: false,
            needs_delta_load: false,
            changes: FxHashMap::default(),
            persist_timer: 0.0,
        }
    }

    /// Re-initializes a pooled chunk for a new lattice position.
    ///
    /// The voxel allocation is kept and cleared in place; all flags, the
    /// change log, and the persist timer reset as if freshly constructed.
    pub fn initialize(&mut self, position: ChunkKey) {
        self.position = position;
        Arc::make_mut(&mut self.voxels).fill(Voxel::EMPTY);
        self.data_dirty = true;
        self.generating = false;
        self.mesh_dirty = false;
        self.status = BuildStatus::NoChange;
        self.mesh_revision += 1;
        self.has_data = false;
        self.visible = false;
        self.needs_delta_load = false;
        self.changes.clear();
        self.persist_timer = 0.0;
    }

    /// Lattice position (chunk-grid coordinates, not world units).
    pub fn position(&self) -> ChunkKey {
        self.position
    }

    /// Side length in voxels.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flat index of a local coordinate: `x + S*(y + S*z)`.
    pub fn local_index(size: usize, x: i32, y: i32, z: i32) -> usize {
        x as usize + size * (y as usize + size * z as usize)
    }

    /// Inverse of [`Chunk::local_index`].
    pub fn coords_of_index(size: usize, index: usize) -> (i32, i32, i32) {
        let x = index % size;
        let y = (index / size) % size;
        let z = index / (size * size);
        (x as i32, y as i32, z as i32)
    }

    /// Returns `true` if every component of `local` lies in `[0, size)`.
    pub fn in_bounds(&self, local: (i32, i32, i32)) -> bool {
        let s = self.size as i32;
        (0..s).contains(&local.0) && (0..s).contains(&local.1) && (0..s).contains(&local.2)
    }

    /// Bounds-checked voxel read.
    pub fn voxel_at(&self, local: (i32, i32, i32)) -> Option<Voxel> {
        if !self.in_bounds(local) {
            return None;
        }
        Some(self.voxels[Self::local_index(self.size, local.0, local.1, local.2)])
    }

    /// Bounds-checked voxel write, recorded in the change log.
    ///
    /// Marks the mesh dirty and re-evaluates `has_data`. Returns the voxel as
    /// written, or `None` if `local` was out of bounds (a logged no-op).
    pub fn set_voxel(&mut self, local: (i32, i32, i32), voxel: Voxel) -> Option<Voxel> {
        if !self.in_bounds(local) {
            tracing::warn!(?local, chunk = ?self.position, "set_voxel out of bounds");
            return None;
        }
        let index = Self::local_index(self.size, local.0, local.1, local.2);
        Arc::make_mut(&mut self.voxels)[index] = voxel;
        self.changes.insert(local, voxel);
        if voxel.is_active() {
            self.has_data = true;
        } else {
            self.recompute_has_data();
        }
        self.mesh_dirty = true;
        Some(voxel)
    }

    /// Writes generated content without touching the change log.
    ///
    /// This is the chunk-processor write path: the result is reproducible
    /// from generation, so it is not an edit and must not be persisted.
    /// Marks the mesh dirty and keeps `has_data` current. Returns `false`
    /// for out-of-bounds coordinates.
    pub fn write_generated(&mut self, local: (i32, i32, i32), voxel: Voxel) -> bool {
        if !self.in_bounds(local) {
            return false;
        }
        let index = Self::local_index(self.size, local.0, local.1, local.2);
        let data = Arc::make_mut(&mut self.voxels);
        let was_active = data[index].is_active();
        data[index] = voxel;
        if voxel.is_active() {
            self.has_data = true;
        } else if was_active {
            self.recompute_has_data();
        }
        self.mesh_dirty = true;
        true
    }

    /// Replaces the voxel array with freshly generated contents.
    ///
    /// The change log is replayed over the new data so prior edits survive
    /// regeneration, then `has_data` is recomputed.
    pub fn apply_generated(&mut self, voxels: Vec<Voxel>, any_active: bool) {
        debug_assert_eq!(voxels.len(), self.size * self.size * self.size);
        self.voxels = Arc::new(voxels);
        self.generating = false;
        if self.changes.is_empty() {
            self.has_data = any_active;
            return;
        }
        let data = Arc::make_mut(&mut self.voxels);
        for (&(x, y, z), voxel) in &self.changes {
            data[Self::local_index(self.size, x, y, z)] = *voxel;
        }
        self.recompute_has_data();
    }

    /// Applies a persisted delta over the current voxel array.
    ///
    /// Records are replayed into the change log so a later save re-persists
    /// them. Out-of-bounds records (from a foreign chunk size) are skipped;
    /// truncated trailing bytes were already dropped by the decoder.
    pub fn load_changes(&mut self, bytes: &[u8]) {
        let records = delta::decode_changes(bytes);
        if records.is_empty() {
            return;
        }
        let data = Arc::make_mut(&mut self.voxels);
        for (local, voxel) in records {
            let s = self.size as i32;
            if !(0..s).contains(&local.0) || !(0..s).contains(&local.1) || !(0..s).contains(&local.2)
            {
                continue;
            }
            data[Self::local_index(self.size, local.0, local.1, local.2)] = voxel;
            self.changes.insert(local, voxel);
        }
        self.recompute_has_data();
        self.mesh_dirty = true;
    }

    /// Serializes the entire change log into delta bytes.
    pub fn encode_changes(&self) -> Vec<u8> {
        delta::encode_changes(self.changes.iter())
    }

    /// Number of entries in the change log.
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Cheap copy-on-write snapshot of the voxel array for worker tasks.
    pub fn snapshot(&self) -> Arc<Vec<Voxel>> {
        Arc::clone(&self.voxels)
    }

    /// Read access to the flat voxel array.
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Mutable access to the flat voxel array (copy-on-write).
    ///
    /// Intended for chunk processors writing generated content; these writes
    /// bypass the change log. Callers that may deactivate voxels must follow
    /// up with [`Chunk::recompute_has_data`].
    pub fn voxels_mut(&mut self) -> &mut [Voxel] {
        Arc::make_mut(&mut self.voxels).as_mut_slice()
    }

    /// Re-scans the array for any active voxel.
    pub fn recompute_has_data(&mut self) {
        self.has_data = self.voxels.iter().any(Voxel::is_active);
    }

    /// `true` iff at least one voxel is active.
    pub fn has_data(&self) -> bool {
        self.has_data
    }

    // -- tick-loop flags ---------------------------------------------------

    /// Voxel contents need (re)generation.
    pub fn is_data_dirty(&self) -> bool {
        self.data_dirty
    }

    /// Sets or clears the data-dirty flag.
    pub fn set_data_dirty(&mut self, dirty: bool) {
        self.data_dirty = dirty;
    }

    /// A generation task is in flight for this chunk.
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Marks a generation task as dispatched.
    pub fn set_generating(&mut self, generating: bool) {
        self.generating = generating;
    }

    /// Geometry needs rebuilding from the current voxel contents.
    pub fn is_mesh_dirty(&self) -> bool {
        self.mesh_dirty
    }

    /// Sets or clears the mesh-dirty flag.
    pub fn set_mesh_dirty(&mut self, dirty: bool) {
        self.mesh_dirty = dirty;
    }

    /// Current build status.
    pub fn build_status(&self) -> BuildStatus {
        self.status
    }

    /// Advances the build-status machine.
    pub fn set_build_status(&mut self, status: BuildStatus) {
        self.status = status;
    }

    /// Monotonic counter used to match async build results to dispatches.
    pub fn mesh_revision(&self) -> u64 {
        self.mesh_revision
    }

    /// Increments and returns the revision for a new dispatch.
    pub fn bump_mesh_revision(&mut self) -> u64 {
        self.mesh_revision += 1;
        self.mesh_revision
    }

    /// Whether the host representation should currently show this chunk.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Sets the host-facing visibility flag.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// A persisted-delta reload is still owed to this chunk.
    pub fn needs_delta_load(&self) -> bool {
        self.needs_delta_load
    }

    /// Sets or clears the pending-delta-load flag.
    pub fn set_needs_delta_load(&mut self, pending: bool) {
        self.needs_delta_load = pending;
    }

    // -- persistence -------------------------------------------------------

    /// (Re)arms the persist countdown to the volume's configured interval.
    pub fn arm_persist_timer(&mut self, interval: f32) {
        self.persist_timer = interval;
    }

    /// Counts the persist timer down by `dt` seconds.
    ///
    /// Returns `true` when a flush is due: the timer was armed, has just
    /// reached zero, and the change log is non-empty. An idle (zero) timer or
    /// an empty log is a no-op. The timer rests at zero after firing; the
    /// next persisting edit re-arms it.
    pub fn tick_persist(&mut self, dt: f32) -> bool {
        if self.changes.is_empty() || self.persist_timer <= 0.0 {
            return false;
        }
        self.persist_timer -= dt;
        if self.persist_timer <= 0.0 {
            self.persist_timer = 0.0;
            return true;
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
