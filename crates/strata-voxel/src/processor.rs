//! The pluggable chunk-processor interface: ordered post-processing stages
//! that run at defined points of a chunk's lifecycle.
//!
//! Processors run on the main tick, never inside worker tasks, which is what
//! makes their one sanctioned liberty safe: writing generated content into a
//! *neighbor* chunk's voxel array (e.g. foliage overhanging a chunk border).
//! All access goes through a [`ProcessorContext`] that borrows the volume's
//! chunk map for the duration of the call.

use crate::chunk::{Chunk, ChunkKey, ChunkMap};
use crate::voxel::Voxel;

/// Lifecycle point a processor is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingSchedule {
    /// After a chunk's voxel data has been generated, before meshing.
    AfterGeneration,
    /// Immediately before each mesh build.
    BeforeMeshing,
    /// Every tick.
    OnTick,
}

/// An ordered pipeline stage that post-processes chunk voxel data.
///
/// Processors with the same schedule run in ascending [`order`](Self::order).
/// Implementations must not assume any chunk iteration order and must not
/// trigger meshing themselves; marking voxels is enough, the tick loop
/// handles the rest.
pub trait ChunkProcessor: Send + Sync {
    /// Which lifecycle point this processor runs at.
    fn schedule(&self) -> ProcessingSchedule;

    /// Sort key within the schedule point.
    fn order(&self) -> i32 {
        0
    }

    /// Processes the target chunk. Returns `false` to report failure, which
    /// is logged by the volume but does not abort the pipeline.
    fn process(&self, ctx: &mut ProcessorContext<'_>) -> bool;
}

/// Scoped access to the target chunk and its streamed-in neighbors.
///
/// Coordinates are relative to the target chunk's local space and may run
/// past `[0, size)` on any axis; out-of-range components resolve into the
/// corresponding neighbor chunk. Writes are generated content and bypass the
/// change log.
pub struct ProcessorContext<'a> {
    chunks: &'a mut ChunkMap,
    target: ChunkKey,
    size: i32,
}

impl<'a> ProcessorContext<'a> {
    /// Builds a context for `target` over the volume's chunk map.
    pub fn new(chunks: &'a mut ChunkMap, target: ChunkKey, size: usize) -> Self {
        Self {
            chunks,
            target,
            size: size as i32,
        }
    }

    /// Position of the chunk being processed.
    pub fn target(&self) -> ChunkKey {
        self.target
    }

    /// Chunk side length in voxels.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// The chunk being processed.
    pub fn chunk(&self) -> &Chunk {
        &self.chunks[&self.target]
    }

    /// Resolves a target-relative coordinate to `(chunk key, wrapped local)`.
    fn resolve(&self, local: (i32, i32, i32)) -> (ChunkKey, (i32, i32, i32)) {
        let key = (
            self.target.0 + local.0.div_euclid(self.size),
            self.target.1 + local.1.div_euclid(self.size),
            self.target.2 + local.2.div_euclid(self.size),
        );
        let wrapped = (
            local.0.rem_euclid(self.size),
            local.1.rem_euclid(self.size),
            local.2.rem_euclid(self.size),
        );
        (key, wrapped)
    }

    /// Reads a voxel, crossing into neighbors for out-of-range coordinates.
    ///
    /// Returns `None` when the owning chunk is not streamed in.
    pub fn voxel(&self, local: (i32, i32, i32)) -> Option<Voxel> {
        let (key, wrapped) = self.resolve(local);
        self.chunks.get(&key).and_then(|chunk| chunk.voxel_at(wrapped))
    }

    /// Writes generated content, crossing into neighbors as needed.
    ///
    /// Returns `false` when the owning chunk is not streamed in.
    pub fn write_voxel(&mut self, local: (i32, i32, i32), voxel: Voxel) -> bool {
        let (key, wrapped) = self.resolve(local);
        match self.chunks.get_mut(&key) {
            Some(chunk) => chunk.write_generated(wrapped, voxel),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    const S: usize = 8;

    fn map_with(keys: &[ChunkKey]) -> ChunkMap {
        let mut map = FxHashMap::default();
        for &key in keys {
            map.insert(key, Chunk::new(key, S));
        }
        map
    }

    #[test]
    fn test_in_range_coordinates_hit_the_target() {
        let mut map = map_with(&[(0, 0, 0)]);
        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);

        assert!(ctx.write_voxel((3, 3, 3), Voxel::solid(1, [255; 4])));
        assert!(ctx.voxel((3, 3, 3)).expect("present").is_active());
        assert!(ctx.chunk().has_data());
    }

    #[test]
    fn test_out_of_range_coordinates_cross_into_neighbors() {
        let mut map = map_with(&[(0, 0, 0), (-1, 0, 0), (0, 1, 0)]);
        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);

        // x = -1 lands in chunk (-1,0,0) at local x = S-1.
        assert!(ctx.write_voxel((-1, 2, 2), Voxel::solid(5, [255; 4])));
        // y = S lands in chunk (0,1,0) at local y = 0.
        assert!(ctx.write_voxel((2, S as i32, 2), Voxel::solid(6, [255; 4])));

        drop(ctx);
        let left = &map[&(-1, 0, 0)];
        assert_eq!(
            left.voxel_at((S as i32 - 1, 2, 2)).expect("in bounds").value,
            5
        );
        assert!(left.is_mesh_dirty());
        assert_eq!(map[&(0, 1, 0)].voxel_at((2, 0, 2)).expect("in bounds").value, 6);
    }

    #[test]
    fn test_absent_neighbor_write_fails_gracefully() {
        let mut map = map_with(&[(0, 0, 0)]);
        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);

        assert!(!ctx.write_voxel((-1, 0, 0), Voxel::solid(1, [255; 4])));
        assert_eq!(ctx.voxel((-1, 0, 0)), None);
    }

    #[test]
    fn test_processor_writes_bypass_change_log() {
        let mut map = map_with(&[(0, 0, 0)]);
        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);
        ctx.write_voxel((1, 1, 1), Voxel::solid(1, [255; 4]));
        drop(ctx);

        assert_eq!(map[&(0, 0, 0)].change_count(), 0);
    }
}
