//! The buffer contract shared by all meshing algorithms.
//!
//! Every algorithm writes vertex positions, per-vertex RGBA colors,
//! 4-component UVs (the third component packs the material index), and
//! triangle indices into the same [`MeshBuffers`] layout, so downstream
//! consumers are mode-agnostic. Buffers are reused across builds: `clear`
//! drops contents but keeps capacity.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// Interleaved vertex layout for the render/collision handoff.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// RGBA color.
    pub color: [u8; 4],
    /// 4-component UV; `uv[2]` carries the material/custom-block index.
    pub uv: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<PackedVertex>(), 32);

/// Reusable mesh output buffers.
#[derive(Clone, Debug, Default)]
pub struct MeshBuffers {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex RGBA colors.
    pub colors: Vec<[u8; 4]>,
    /// Per-vertex 4-component UVs.
    pub uvs: Vec<[f32; 4]>,
    /// Triangle indices, three per triangle.
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    /// Creates empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all contents, keeping allocations for the next build.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.uvs.clear();
        self.indices.clear();
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if the mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Appends one vertex and returns its index.
    pub fn push_vertex(&mut self, position: [f32; 3], color: [u8; 4], uv: [f32; 4]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.colors.push(color);
        self.uvs.push(uv);
        index
    }

    /// Appends one triangle.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Interleaves the buffers into the packed handoff layout.
    pub fn packed_vertices(&self) -> Vec<PackedVertex> {
        (0..self.vertex_count())
            .map(|i| PackedVertex {
                position: self.positions[i],
                color: self.colors[i],
                uv: self.uvs[i],
            })
            .collect()
    }
}
