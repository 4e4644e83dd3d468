//! Meshing-mode selection and the common entry point all consumers share.

use serde::{Deserialize, Serialize};

use crate::buffers::MeshBuffers;
use crate::culled::generate_culled;
use crate::greedy::generate_greedy;
use crate::marching::generate_marching;
use crate::neighborhood::VoxelNeighborhood;
use crate::registry::BlockMeshRegistry;

/// Which geometry-extraction algorithm a volume uses.
///
/// All variants write into the same [`MeshBuffers`] contract, and the render
/// and collision meshes of a volume may select different modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshingMode {
    /// One quad per visible voxel face. Cheapest, most triangles.
    #[default]
    Culled,
    /// Culled visibility with coplanar same-material merging.
    Greedy,
    /// Marching-cubes isosurface for organic terrain.
    Marching,
}

/// Runs the selected algorithm over a neighborhood snapshot into `out`.
pub fn generate(
    mode: MeshingMode,
    neighborhood: &VoxelNeighborhood,
    registry: &BlockMeshRegistry,
    voxel_size: f32,
    self_shade_intensity: f32,
    out: &mut MeshBuffers,
) {
    match mode {
        MeshingMode::Culled => {
            generate_culled(neighborhood, registry, voxel_size, self_shade_intensity, out)
        }
        MeshingMode::Greedy => {
            generate_greedy(neighborhood, registry, voxel_size, self_shade_intensity, out)
        }
        MeshingMode::Marching => generate_marching(neighborhood, voxel_size, out),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_voxel::Voxel;

    use super::*;

    const S: usize = 8;

    #[test]
    fn test_all_modes_empty_chunk_yield_zero_geometry() {
        let neighborhood =
            VoxelNeighborhood::from_center(S, Arc::new(vec![Voxel::EMPTY; S * S * S]));
        let registry = BlockMeshRegistry::new();

        for mode in [MeshingMode::Culled, MeshingMode::Greedy, MeshingMode::Marching] {
            let mut out = MeshBuffers::new();
            generate(mode, &neighborhood, &registry, 1.0, 0.2, &mut out);
            assert!(out.is_empty(), "{mode:?} emitted geometry for empty input");
            assert!(out.indices.is_empty());
        }
    }

    #[test]
    fn test_all_modes_share_the_buffer_contract() {
        let mut grid = vec![Voxel::EMPTY; S * S * S];
        grid[0] = Voxel::solid(1, [255; 4]);
        let neighborhood = VoxelNeighborhood::from_center(S, Arc::new(grid));
        let registry = BlockMeshRegistry::new();

        for mode in [MeshingMode::Culled, MeshingMode::Greedy, MeshingMode::Marching] {
            let mut out = MeshBuffers::new();
            generate(mode, &neighborhood, &registry, 1.0, 0.2, &mut out);
            assert!(!out.is_empty(), "{mode:?} emitted nothing");
            assert_eq!(out.positions.len(), out.colors.len());
            assert_eq!(out.positions.len(), out.uvs.len());
            assert_eq!(out.indices.len() % 3, 0);
            let max = *out.indices.iter().max().expect("indices present");
            assert!((max as usize) < out.vertex_count());
        }
    }
}
