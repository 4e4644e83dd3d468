//! Edit events raised whenever a voxel is added or removed.
//!
//! Events are collected into a double-buffered [`EditEventBuffer`]: the host
//! (editing tools, network replication) reads events for up to two frames
//! after they were sent, then they are dropped. Call
//! [`swap`](EditEventBuffer::swap) once per frame.

use crate::chunk::ChunkKey;

/// Raised for every explicit voxel edit that goes through a volume.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelEditEvent {
    /// Identifier of the edited volume.
    pub volume_id: String,
    /// Chunk-lattice position of the edited chunk.
    pub chunk: ChunkKey,
    /// Local voxel coordinate within the chunk.
    pub voxel: (i32, i32, i32),
    /// Post-edit state byte.
    pub state: u8,
    /// Post-edit value byte.
    pub value: u8,
    /// Post-edit color.
    pub color: [u8; 4],
    /// World-space position of the voxel center.
    pub world_position: [f32; 3],
}

/// Double-buffered storage for [`VoxelEditEvent`]s.
#[derive(Default)]
pub struct EditEventBuffer {
    prev: Vec<VoxelEditEvent>,
    current: Vec<VoxelEditEvent>,
}

impl EditEventBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event in the current frame.
    pub fn send(&mut self, event: VoxelEditEvent) {
        self.current.push(event);
    }

    /// All readable events (previous + current frame).
    pub fn read(&self) -> impl Iterator<Item = &VoxelEditEvent> {
        self.prev.iter().chain(self.current.iter())
    }

    /// Number of readable events.
    pub fn len(&self) -> usize {
        self.prev.len() + self.current.len()
    }

    /// Returns `true` if no events are readable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances the frame: previous events are dropped, current becomes
    /// previous.
    pub fn swap(&mut self) {
        self.prev.clear();
        std::mem::swap(&mut self.prev, &mut self.current);
    }
}
