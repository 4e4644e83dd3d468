//! Volume orchestration: sparse chunk streaming, asynchronous generation and
//! meshing, edits, and delta persistence.

pub mod config;
pub mod generation;
pub mod volume;

pub use config::{ConfigError, InfiniteConfig, StreamingMode, VolumeConfig};
pub use generation::{GeneratedData, GenerationJob, GenerationPipeline, run_generation_job};
pub use volume::Volume;
