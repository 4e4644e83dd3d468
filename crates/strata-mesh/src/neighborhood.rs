//! Caller-owned 3×3×3 snapshot of a chunk and its 26 neighbors.
//!
//! A [`VoxelNeighborhood`] is assembled on the main tick from cheap
//! copy-on-write [`Arc`] snapshots and handed to meshing tasks, so workers
//! never touch live chunk storage. Absent neighbors read as all-empty.

use std::sync::Arc;

use strata_voxel::{Chunk, Voxel};

/// Snapshot of the 27-chunk neighborhood around one chunk.
///
/// Voxel lookups accept coordinates in `[-size, 2*size)` per axis, relative
/// to the center chunk's local space; out-of-range components resolve into
/// the matching neighbor slot.
#[derive(Clone, Debug)]
pub struct VoxelNeighborhood {
    size: i32,
    grids: [Option<Arc<Vec<Voxel>>>; 27],
}

impl VoxelNeighborhood {
    /// Creates a neighborhood with every slot absent.
    pub fn new(size: usize) -> Self {
        Self {
            size: size as i32,
            grids: std::array::from_fn(|_| None),
        }
    }

    /// Creates a neighborhood holding only a center grid.
    pub fn from_center(size: usize, center: Arc<Vec<Voxel>>) -> Self {
        let mut neighborhood = Self::new(size);
        neighborhood.set((0, 0, 0), center);
        neighborhood
    }

    /// Chunk side length in voxels.
    pub fn size(&self) -> i32 {
        self.size
    }

    fn slot(offset: (i32, i32, i32)) -> usize {
        debug_assert!((-1..=1).contains(&offset.0));
        debug_assert!((-1..=1).contains(&offset.1));
        debug_assert!((-1..=1).contains(&offset.2));
        ((offset.0 + 1) + 3 * ((offset.1 + 1) + 3 * (offset.2 + 1))) as usize
    }

    /// Installs a chunk's voxel grid at the given neighbor offset
    /// (each component in `-1..=1`; `(0, 0, 0)` is the center).
    pub fn set(&mut self, offset: (i32, i32, i32), grid: Arc<Vec<Voxel>>) {
        debug_assert_eq!(grid.len(), (self.size * self.size * self.size) as usize);
        self.grids[Self::slot(offset)] = Some(grid);
    }

    /// The center chunk's grid, if present.
    pub fn center(&self) -> Option<&Arc<Vec<Voxel>>> {
        self.grids[Self::slot((0, 0, 0))].as_ref()
    }

    /// Reads a voxel at center-relative coordinates.
    ///
    /// Coordinates outside `[0, size)` resolve into neighbors; absent
    /// neighbors read as [`Voxel::EMPTY`].
    pub fn voxel(&self, x: i32, y: i32, z: i32) -> Voxel {
        let offset = (
            x.div_euclid(self.size),
            y.div_euclid(self.size),
            z.div_euclid(self.size),
        );
        let Some(grid) = &self.grids[Self::slot(offset)] else {
            return Voxel::EMPTY;
        };
        let index = Chunk::local_index(
            self.size as usize,
            x.rem_euclid(self.size),
            y.rem_euclid(self.size),
            z.rem_euclid(self.size),
        );
        grid[index]
    }

    /// Returns `true` if the voxel at center-relative coordinates is active.
    pub fn is_active(&self, x: i32, y: i32, z: i32) -> bool {
        self.voxel(x, y, z).is_active()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const S: usize = 8;

    fn grid_with(actives: &[(i32, i32, i32)]) -> Arc<Vec<Voxel>> {
        let mut grid = vec![Voxel::EMPTY; S * S * S];
        for &(x, y, z) in actives {
            grid[Chunk::local_index(S, x, y, z)] = Voxel::solid(1, [255; 4]);
        }
        Arc::new(grid)
    }

    #[test]
    fn test_center_lookup() {
        let neighborhood = VoxelNeighborhood::from_center(S, grid_with(&[(2, 3, 4)]));
        assert!(neighborhood.is_active(2, 3, 4));
        assert!(!neighborhood.is_active(2, 3, 5));
    }

    #[test]
    fn test_absent_neighbors_read_empty() {
        let neighborhood = VoxelNeighborhood::from_center(S, grid_with(&[]));
        assert!(!neighborhood.is_active(-1, 0, 0));
        assert!(!neighborhood.is_active(S as i32, 0, 0));
        assert!(!neighborhood.is_active(-1, -1, -1));
    }

    #[test]
    fn test_negative_coordinates_resolve_to_lower_neighbor() {
        let mut neighborhood = VoxelNeighborhood::new(S);
        // Neighbor at (-1, 0, 0) has a voxel on its far x face.
        neighborhood.set((-1, 0, 0), grid_with(&[(S as i32 - 1, 4, 4)]));
        assert!(neighborhood.is_active(-1, 4, 4));
        assert!(!neighborhood.is_active(-2, 4, 4));
    }

    #[test]
    fn test_corner_neighbor_resolution() {
        let mut neighborhood = VoxelNeighborhood::new(S);
        neighborhood.set((1, 1, 1), grid_with(&[(0, 0, 0)]));
        assert!(neighborhood.is_active(S as i32, S as i32, S as i32));
    }
}
