//! Geometry extraction for voxel chunks: culled, greedy, and marching-cubes
//! meshing over neighborhood snapshots, plus the async meshing pipeline.

pub mod buffers;
pub mod culled;
pub mod face;
pub mod generate;
pub mod greedy;
pub mod marching;
pub mod neighborhood;
pub mod pipeline;
pub mod registry;
pub mod shading;

pub use buffers::{MeshBuffers, PackedVertex};
pub use culled::{face_visible, generate_culled, occludes};
pub use face::FaceDirection;
pub use generate::{MeshingMode, generate};
pub use greedy::generate_greedy;
pub use marching::generate_marching;
pub use neighborhood::VoxelNeighborhood;
pub use pipeline::{ChunkMeshes, MeshJob, MeshPipeline, MeshResult, run_mesh_job};
pub use registry::{BlockFragment, BlockMeshRegistry, emit_fragment};
pub use shading::{face_occlusion, shade, should_flip_diagonal, vertex_occlusion};
