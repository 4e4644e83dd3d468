//! Culled meshing: one quad per visible voxel face.
//!
//! A face is visible when its face-adjacent neighbor (in-chunk or across the
//! chunk border via the neighborhood snapshot) does not occlude it. Cheapest
//! algorithm, most triangles. Shared helpers here define the visibility rule
//! and quad emission used by the greedy variant as well, so both produce the
//! same silhouette.

use strata_voxel::{STATE_SOLID, Voxel};

use crate::buffers::MeshBuffers;
use crate::face::FaceDirection;
use crate::neighborhood::VoxelNeighborhood;
use crate::registry::{BlockMeshRegistry, emit_fragment};
use crate::shading::{face_occlusion, shade, should_flip_diagonal};

/// Whether a voxel hides the face of its neighbor.
///
/// Only plain solid blocks occlude; custom blocks (foliage, slabs, …) have
/// see-through geometry, so faces behind them still render.
pub fn occludes(voxel: Voxel) -> bool {
    voxel.state == STATE_SOLID
}

/// The shared visibility rule: a face is emitted iff its neighbor across
/// `direction` does not occlude it.
pub fn face_visible(
    neighborhood: &VoxelNeighborhood,
    x: i32,
    y: i32,
    z: i32,
    direction: FaceDirection,
) -> bool {
    let (nx, ny, nz) = direction.offset(x, y, z);
    !occludes(neighborhood.voxel(nx, ny, nz))
}

/// Emits one axis-aligned quad covering `w × h` cells of a face layer.
///
/// `layer`, `u0`, `v0` are cell coordinates in the direction's sweep axes;
/// corners are ordered `(u0,v0), (u0+w,v0), (u0+w,v0+h), (u0,v0+h)` and the
/// occlusion levels follow that order. Winding and the shading-driven
/// diagonal split are handled here.
#[allow(clippy::too_many_arguments)]
pub(crate) fn emit_quad(
    out: &mut MeshBuffers,
    direction: FaceDirection,
    layer: i32,
    u0: i32,
    v0: i32,
    w: i32,
    h: i32,
    voxel: Voxel,
    occlusion: [u8; 4],
    voxel_size: f32,
    intensity: f32,
) {
    let (layer_axis, u_axis, v_axis) = direction.sweep_axes();
    let layer_pos = (layer + if direction.sign() > 0 { 1 } else { 0 }) as f32;

    let corners = [
        (u0 as f32, v0 as f32),
        ((u0 + w) as f32, v0 as f32),
        ((u0 + w) as f32, (v0 + h) as f32),
        (u0 as f32, (v0 + h) as f32),
    ];
    let uvs = [
        [0.0, 0.0],
        [w as f32, 0.0],
        [w as f32, h as f32],
        [0.0, h as f32],
    ];

    let base = out.vertex_count() as u32;
    for (i, &(cu, cv)) in corners.iter().enumerate() {
        let mut position = [0.0f32; 3];
        position[layer_axis] = layer_pos;
        position[u_axis] = cu;
        position[v_axis] = cv;
        for component in &mut position {
            *component *= voxel_size;
        }
        out.push_vertex(
            position,
            shade(voxel.color, occlusion[i], intensity),
            [uvs[i][0], uvs[i][1], voxel.value as f32, 0.0],
        );
    }

    // Canonical corner order winds outward for negative directions; positive
    // directions reverse. The diagonal split follows the occlusion pattern.
    let flip = should_flip_diagonal(occlusion);
    let order: [u32; 6] = match (direction.sign() > 0, flip) {
        (false, false) => [0, 1, 2, 0, 2, 3],
        (false, true) => [1, 2, 3, 1, 3, 0],
        (true, false) => [0, 2, 1, 0, 3, 2],
        (true, true) => [1, 3, 2, 1, 0, 3],
    };
    for offset in order {
        out.indices.push(base + offset);
    }
}

/// Runs culled meshing over the neighborhood's center chunk into `out`.
pub fn generate_culled(
    neighborhood: &VoxelNeighborhood,
    registry: &BlockMeshRegistry,
    voxel_size: f32,
    intensity: f32,
    out: &mut MeshBuffers,
) {
    out.clear();
    let size = neighborhood.size();

    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let voxel = neighborhood.voxel(x, y, z);
                if !voxel.is_active() {
                    continue;
                }
                if voxel.is_custom() {
                    if let Some(fragment) = registry.get(voxel.value) {
                        emit_fragment(fragment, voxel, (x, y, z), voxel_size, out);
                        continue;
                    }
                    // No fragment registered: fall back to cube faces.
                }
                for direction in FaceDirection::ALL {
                    if !face_visible(neighborhood, x, y, z, direction) {
                        continue;
                    }
                    let occlusion = face_occlusion(neighborhood, (x, y, z), direction);
                    let (layer_axis, u_axis, v_axis) = direction.sweep_axes();
                    let cell = [x, y, z];
                    emit_quad(
                        out,
                        direction,
                        cell[layer_axis],
                        cell[u_axis],
                        cell[v_axis],
                        1,
                        1,
                        voxel,
                        occlusion,
                        voxel_size,
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
