//! Built-in voxel data generators: heightmap terrain, deterministic scatter,
//! and the tree canopy processor.

pub mod heightmap;
pub mod scatter;
pub mod terrain;
pub mod trees;

pub use heightmap::{HeightmapParams, HeightmapSampler};
pub use scatter::ScatterGenerator;
pub use terrain::{TerrainGenerator, TerrainParams};
pub use trees::TreeProcessor;
