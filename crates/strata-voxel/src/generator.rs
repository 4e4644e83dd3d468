//! The pluggable voxel-data generator interface.

use crate::voxel::Voxel;

/// Produces voxel contents for any absolute lattice coordinate.
///
/// One generator instance is bound per volume. `generate_voxel` is invoked
/// from worker threads for many coordinates concurrently, so implementations
/// must be `Send + Sync` and must not rely on call ordering. Seeding happens
/// at construction time. Returning [`Voxel::EMPTY`] (state `0`) means the
/// cell is empty.
pub trait VoxelDataGenerator: Send + Sync {
    /// Readiness gate: some generators fetch data asynchronously and are
    /// polled until ready. Defaults to always ready.
    fn is_ready(&self) -> bool {
        true
    }

    /// Generates the voxel at an absolute voxel-lattice coordinate.
    fn generate_voxel(&self, x: i32, y: i32, z: i32) -> Voxel;
}

/// Fills every cell with the same solid voxel. The volume's default binding.
#[derive(Clone, Debug)]
pub struct SolidGenerator {
    /// Material index written into every voxel.
    pub value: u8,
    /// Color written into every voxel.
    pub color: [u8; 4],
}

impl Default for SolidGenerator {
    fn default() -> Self {
        Self {
            value: 0,
            color: [255; 4],
        }
    }
}

impl VoxelDataGenerator for SolidGenerator {
    fn generate_voxel(&self, _x: i32, _y: i32, _z: i32) -> Voxel {
        Voxel::solid(self.value, self.color)
    }
}
