//! Volume-level registry of predefined mesh fragments for custom blocks.
//!
//! A voxel with `state >= 2` substitutes a [`BlockFragment`] looked up by its
//! `value` instead of generated cube faces, with an optional 4-way yaw
//! orientation taken from the voxel's state bits. Custom blocks without a
//! registered fragment fall back to ordinary cube faces.

use rustc_hash::FxHashMap;
use strata_voxel::Voxel;

use crate::buffers::MeshBuffers;

/// A predefined mesh fragment in unit-cube space (`[0, 1]³`).
#[derive(Clone, Debug)]
pub struct BlockFragment {
    /// Vertex positions within the unit cube.
    pub positions: Vec<[f32; 3]>,
    /// 4-component UVs; `uv[2]` is overwritten with the voxel value on emit.
    pub uvs: Vec<[f32; 4]>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl BlockFragment {
    /// Two crossed quads, the classic foliage/plant imposter.
    pub fn cross() -> Self {
        let positions = vec![
            // Diagonal quad A.
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 0.0],
            // Diagonal quad B.
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 0.0],
        ];
        let uvs = vec![
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
        ];
        // Both sides of each quad so the cross reads from every angle.
        let indices = vec![
            0, 1, 2, 0, 2, 3, 0, 2, 1, 0, 3, 2, //
            4, 5, 6, 4, 6, 7, 4, 6, 5, 4, 7, 6,
        ];
        Self {
            positions,
            uvs,
            indices,
        }
    }

    /// A half-height slab resting on the cell floor.
    pub fn slab() -> Self {
        let mut positions = Vec::new();
        let mut uvs = Vec::new();
        let mut indices = Vec::new();
        let h = 0.5;

        // Top face plus four sides; the bottom sits on the cell below.
        let faces: [[[f32; 3]; 4]; 5] = [
            [[0.0, h, 0.0], [0.0, h, 1.0], [1.0, h, 1.0], [1.0, h, 0.0]],
            [[0.0, 0.0, 0.0], [0.0, h, 0.0], [1.0, h, 0.0], [1.0, 0.0, 0.0]],
            [[1.0, 0.0, 1.0], [1.0, h, 1.0], [0.0, h, 1.0], [0.0, 0.0, 1.0]],
            [[0.0, 0.0, 1.0], [0.0, h, 1.0], [0.0, h, 0.0], [0.0, 0.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, h, 0.0], [1.0, h, 1.0], [1.0, 0.0, 1.0]],
        ];
        for face in faces {
            let base = positions.len() as u32;
            positions.extend_from_slice(&face);
            uvs.extend_from_slice(&[
                [0.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0, 0.0],
                [1.0, 0.0, 0.0, 0.0],
            ]);
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self {
            positions,
            uvs,
            indices,
        }
    }

    /// Rotates a unit-cube position around the vertical axis in 90° steps.
    fn rotate_yaw(position: [f32; 3], steps: u8) -> [f32; 3] {
        let mut p = position;
        for _ in 0..(steps & 0b11) {
            p = [p[2], p[1], 1.0 - p[0]];
        }
        p
    }
}

/// Maps voxel `value` → mesh fragment for custom-block substitution.
#[derive(Clone, Debug, Default)]
pub struct BlockMeshRegistry {
    fragments: FxHashMap<u8, BlockFragment>,
}

impl BlockMeshRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the fragment for a voxel value.
    pub fn insert(&mut self, value: u8, fragment: BlockFragment) {
        self.fragments.insert(value, fragment);
    }

    /// Looks up the fragment for a voxel value.
    pub fn get(&self, value: u8) -> Option<&BlockFragment> {
        self.fragments.get(&value)
    }

    /// Number of registered fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns `true` if no fragments are registered.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Emits a fragment for a custom-block voxel at local cell `origin`.
///
/// The fragment is yaw-rotated by the voxel's orientation, translated to the
/// cell, scaled to world units, tinted with the voxel color, and its
/// `uv[2]` components replaced by the voxel value.
pub fn emit_fragment(
    fragment: &BlockFragment,
    voxel: Voxel,
    origin: (i32, i32, i32),
    voxel_size: f32,
    out: &mut MeshBuffers,
) {
    let base = out.vertex_count() as u32;
    let steps = voxel.orientation();
    for (position, uv) in fragment.positions.iter().zip(&fragment.uvs) {
        let rotated = BlockFragment::rotate_yaw(*position, steps);
        let world = [
            (origin.0 as f32 + rotated[0]) * voxel_size,
            (origin.1 as f32 + rotated[1]) * voxel_size,
            (origin.2 as f32 + rotated[2]) * voxel_size,
        ];
        out.push_vertex(world, voxel.color, [uv[0], uv[1], voxel.value as f32, uv[3]]);
    }
    for &index in &fragment.indices {
        out.indices.push(base + index);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
