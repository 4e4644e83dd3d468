//! Volume configuration with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_mesh::MeshingMode;

/// Errors that can occur when loading or parsing a volume configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read volume config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse volume config: {0}")]
    ParseError(#[source] ron::error::SpannedError),
}

/// How a volume streams chunks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StreamingMode {
    /// Flood-fill outward from the origin in expanding shells until an
    /// entire shell yields no content.
    Finite,
    /// Maintain a radius of chunks around a moving observation point.
    Infinite(InfiniteConfig),
}

/// Parameters for infinite-mode streaming.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfiniteConfig {
    /// Streaming radius in chunk-lattice units.
    pub radius: i32,
    /// Per-axis clamp on chunk coordinates; `0` leaves an axis unbounded.
    pub bounds: (i32, i32, i32),
    /// Seconds between streaming-sweep ticks.
    pub update_interval: f32,
    /// Number of round-robin slices a sweep is divided into.
    pub slices: u32,
    /// Width of the central band considered fresh once fully covered.
    pub update_margin: i32,
}

impl Default for InfiniteConfig {
    fn default() -> Self {
        Self {
            radius: 6,
            bounds: (0, 0, 0),
            update_interval: 0.25,
            slices: 8,
            update_margin: 2,
        }
    }
}

/// Full configuration for one volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Stable identifier, used as the persistence key prefix.
    pub identifier: String,
    /// Chunk side length in voxels.
    pub chunk_size: usize,
    /// World-unit size of one voxel.
    pub voxel_size: f32,
    /// Seed handed to generator bindings.
    pub seed: u64,
    /// Algorithm for render meshes.
    pub meshing_mode: MeshingMode,
    /// Algorithm for a separately built collision mesh; `None` means the
    /// render mesh doubles as the collider.
    pub collider_mode: Option<MeshingMode>,
    /// Self-shading intensity in `[0, 1]`.
    pub self_shading_intensity: f32,
    /// Streaming behavior.
    pub streaming: StreamingMode,
    /// Seconds between an edit and its delta flush to the persister.
    pub persist_interval: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            identifier: "volume".to_owned(),
            chunk_size: 16,
            voxel_size: 1.0,
            seed: 0,
            meshing_mode: MeshingMode::Culled,
            collider_mode: None,
            self_shading_intensity: 0.2,
            streaming: StreamingMode::Finite,
            persist_interval: 5.0,
        }
    }
}

impl VolumeConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::de::from_str(text).map_err(ConfigError::ParseError)
    }

    /// Loads a configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_ron_str(&text)
    }

    /// The infinite-streaming parameters, if this volume is infinite.
    pub fn infinite(&self) -> Option<&InfiniteConfig> {
        match &self.streaming {
            StreamingMode::Infinite(config) => Some(config),
            StreamingMode::Finite => None,
        }
    }
}
