//! Greedy meshing: merges coplanar runs of identical visible faces into
//! larger rectangular quads.
//!
//! Uses the exact visibility rule of the culled variant, so the rendered
//! silhouette is identical; only the quad decomposition differs. Faces merge
//! when their voxels compare equal (state, value, and color) and their four
//! shading levels match, so merging never smears self-shading.

use strata_voxel::Voxel;

use crate::buffers::MeshBuffers;
use crate::culled::{emit_quad, face_visible};
use crate::face::FaceDirection;
use crate::neighborhood::VoxelNeighborhood;
use crate::registry::{BlockMeshRegistry, emit_fragment};
use crate::shading::face_occlusion;

/// Runs greedy meshing over the neighborhood's center chunk into `out`.
pub fn generate_greedy(
    neighborhood: &VoxelNeighborhood,
    registry: &BlockMeshRegistry,
    voxel_size: f32,
    intensity: f32,
    out: &mut MeshBuffers,
) {
    out.clear();
    let size = neighborhood.size();

    // Custom blocks substitute their fragment once, outside the face sweeps.
    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let voxel = neighborhood.voxel(x, y, z);
                if voxel.is_active() && voxel.is_custom() {
                    if let Some(fragment) = registry.get(voxel.value) {
                        emit_fragment(fragment, voxel, (x, y, z), voxel_size, out);
                    }
                }
            }
        }
    }

    let area = (size * size) as usize;
    let mut mask: Vec<Option<(Voxel, [u8; 4])>> = vec![None; area];
    let mut visited = vec![false; area];

    for direction in FaceDirection::ALL {
        let (layer_axis, u_axis, v_axis) = direction.sweep_axes();

        for layer in 0..size {
            // Collect this layer's visible faces with their shading.
            for v in 0..size {
                for u in 0..size {
                    let mut cell = [0i32; 3];
                    cell[layer_axis] = layer;
                    cell[u_axis] = u;
                    cell[v_axis] = v;
                    let voxel = neighborhood.voxel(cell[0], cell[1], cell[2]);

                    let fragment_substituted =
                        voxel.is_custom() && registry.get(voxel.value).is_some();
                    mask[(v * size + u) as usize] = if voxel.is_active()
                        && !fragment_substituted
                        && face_visible(neighborhood, cell[0], cell[1], cell[2], direction)
                    {
                        let occlusion =
                            face_occlusion(neighborhood, (cell[0], cell[1], cell[2]), direction);
                        Some((voxel, occlusion))
                    } else {
                        None
                    };
                }
            }
            visited.fill(false);

            for v0 in 0..size {
                for u0 in 0..size {
                    let index = (v0 * size + u0) as usize;
                    if visited[index] {
                        continue;
                    }
                    let Some((voxel, occlusion)) = mask[index] else {
                        continue;
                    };

                    // Extend the run along u.
                    let mut w = 1;
                    while u0 + w < size {
                        let next = (v0 * size + u0 + w) as usize;
                        if visited[next] || mask[next] != Some((voxel, occlusion)) {
                            break;
                        }
                        w += 1;
                    }

                    // Extend along v while every row cell still matches.
                    let mut h = 1;
                    'grow: while v0 + h < size {
                        for du in 0..w {
                            let next = ((v0 + h) * size + u0 + du) as usize;
                            if visited[next] || mask[next] != Some((voxel, occlusion)) {
                                break 'grow;
                            }
                        }
                        h += 1;
                    }

                    for dv in 0..h {
                        for du in 0..w {
                            visited[((v0 + dv) * size + u0 + du) as usize] = true;
                        }
                    }

                    emit_quad(
                        out, direction, layer, u0, v0, w, h, voxel, occlusion, voxel_size,
                        intensity,
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
