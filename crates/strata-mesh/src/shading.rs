//! Self-shading: approximate per-vertex occlusion from neighbor occupancy.
//!
//! Each visible face has four vertices; for each vertex, two side neighbors
//! and the diagonal corner neighbor are checked, giving an occlusion level
//! `0..=3` that darkens the vertex color by the volume's self-shading
//! intensity. This is an ambient-occlusion-like approximation, not a light
//! transport solution.

use crate::face::FaceDirection;
use crate::neighborhood::VoxelNeighborhood;

/// Occlusion level for one vertex from its three shading neighbors.
///
/// `0` is fully exposed, `3` fully occluded. Two solid sides occlude the
/// corner entirely regardless of the corner voxel.
pub fn vertex_occlusion(side1: bool, side2: bool, corner: bool) -> u8 {
    if side1 && side2 {
        3
    } else {
        side1 as u8 + side2 as u8 + corner as u8
    }
}

/// Neighbor offsets `(side1, side2, corner)` for the four vertices of a face,
/// in canonical corner order `(u, v), (u+1, v), (u+1, v+1), (u, v+1)`.
///
/// Offsets are relative to the voxel owning the face and always step one
/// cell along the face normal.
pub fn face_vertex_offsets(direction: FaceDirection) -> [[(i32, i32, i32); 3]; 4] {
    let (layer_axis, u_axis, v_axis) = direction.sweep_axes();
    let sign = direction.sign();

    let corner_offsets = |su: i32, sv: i32| {
        let mut side1 = [0i32; 3];
        side1[layer_axis] = sign;
        side1[u_axis] = su;

        let mut side2 = [0i32; 3];
        side2[layer_axis] = sign;
        side2[v_axis] = sv;

        let mut corner = [0i32; 3];
        corner[layer_axis] = sign;
        corner[u_axis] = su;
        corner[v_axis] = sv;

        [
            (side1[0], side1[1], side1[2]),
            (side2[0], side2[1], side2[2]),
            (corner[0], corner[1], corner[2]),
        ]
    };

    [
        corner_offsets(-1, -1),
        corner_offsets(1, -1),
        corner_offsets(1, 1),
        corner_offsets(-1, 1),
    ]
}

/// Computes the four vertex occlusion levels for a voxel's face.
pub fn face_occlusion(
    neighborhood: &VoxelNeighborhood,
    (x, y, z): (i32, i32, i32),
    direction: FaceDirection,
) -> [u8; 4] {
    let offsets = face_vertex_offsets(direction);
    std::array::from_fn(|i| {
        let [s1, s2, c] = offsets[i];
        vertex_occlusion(
            neighborhood.is_active(x + s1.0, y + s1.1, z + s1.2),
            neighborhood.is_active(x + s2.0, y + s2.1, z + s2.2),
            neighborhood.is_active(x + c.0, y + c.1, z + c.2),
        )
    })
}

/// Darkens a color by the occlusion level scaled with the shading intensity.
pub fn shade(color: [u8; 4], occlusion: u8, intensity: f32) -> [u8; 4] {
    let factor = 1.0 - intensity.clamp(0.0, 1.0) * (occlusion as f32 / 3.0);
    [
        (color[0] as f32 * factor) as u8,
        (color[1] as f32 * factor) as u8,
        (color[2] as f32 * factor) as u8,
        color[3],
    ]
}

/// Splits a quad along the other diagonal when that interpolates the four
/// occlusion levels more smoothly.
pub fn should_flip_diagonal(occlusion: [u8; 4]) -> bool {
    occlusion[0] + occlusion[2] > occlusion[1] + occlusion[3]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_voxel::{Chunk, Voxel};

    const S: usize = 8;

    #[test]
    fn test_vertex_occlusion_levels() {
        assert_eq!(vertex_occlusion(false, false, false), 0);
        assert_eq!(vertex_occlusion(true, false, false), 1);
        assert_eq!(vertex_occlusion(true, false, true), 2);
        assert_eq!(vertex_occlusion(true, true, false), 3);
        assert_eq!(vertex_occlusion(true, true, true), 3);
    }

    #[test]
    fn test_shade_zero_intensity_is_identity() {
        let color = [200, 100, 50, 255];
        assert_eq!(shade(color, 3, 0.0), color);
    }

    #[test]
    fn test_shade_darkens_with_occlusion() {
        let color = [200, 100, 50, 255];
        let shaded = shade(color, 3, 0.5);
        assert_eq!(shaded, [100, 50, 25, 255]);
        // Alpha untouched.
        assert_eq!(shaded[3], 255);
        // Lower occlusion darkens less.
        assert!(shade(color, 1, 0.5)[0] > shaded[0]);
    }

    #[test]
    fn test_exposed_face_has_no_occlusion() {
        let mut grid = vec![Voxel::EMPTY; S * S * S];
        grid[Chunk::local_index(S, 4, 4, 4)] = Voxel::solid(1, [255; 4]);
        let neighborhood = VoxelNeighborhood::from_center(S, Arc::new(grid));

        for dir in FaceDirection::ALL {
            assert_eq!(face_occlusion(&neighborhood, (4, 4, 4), dir), [0; 4]);
        }
    }

    #[test]
    fn test_adjacent_block_occludes_shared_vertices() {
        let mut grid = vec![Voxel::EMPTY; S * S * S];
        grid[Chunk::local_index(S, 4, 4, 4)] = Voxel::solid(1, [255; 4]);
        // A block diagonally up from the voxel occludes two +Y face vertices.
        grid[Chunk::local_index(S, 5, 5, 4)] = Voxel::solid(1, [255; 4]);
        let neighborhood = VoxelNeighborhood::from_center(S, Arc::new(grid));

        let occlusion = face_occlusion(&neighborhood, (4, 4, 4), FaceDirection::PosY);
        assert!(occlusion.iter().any(|&o| o > 0));
        assert!(occlusion.iter().any(|&o| o == 0));
    }

    #[test]
    fn test_diagonal_flip_rule() {
        assert!(should_flip_diagonal([3, 0, 3, 0]));
        assert!(!should_flip_diagonal([0, 3, 0, 3]));
        assert!(!should_flip_diagonal([1, 1, 1, 1]));
    }
}
