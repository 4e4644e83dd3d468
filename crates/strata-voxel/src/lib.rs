//! Voxel data model, chunk storage, edit deltas, and the pluggable
//! generator/persister/processor interfaces.

pub mod chunk;
pub mod delta;
pub mod events;
pub mod generator;
pub mod persister;
pub mod processor;
pub mod voxel;

pub use chunk::{BuildStatus, Chunk, ChunkKey, ChunkMap};
pub use events::{EditEventBuffer, VoxelEditEvent};
pub use generator::{SolidGenerator, VoxelDataGenerator};
pub use persister::{
    ChangesReceiver, ChangesSender, ChunkChanges, DiskPersister, VoxelDataPersister,
    changes_channel,
};
pub use processor::{ChunkProcessor, ProcessingSchedule, ProcessorContext};
pub use voxel::{STATE_CUSTOM, STATE_EMPTY, STATE_SOLID, Voxel};
