//! The fixed-layout voxel record stored in every chunk cell.
//!
//! A [`Voxel`] is pure data: one state byte, one value byte, and four color
//! bytes. It packs to exactly [`Voxel::BYTE_SIZE`] bytes for the persistence
//! delta format and carries no behavior beyond encoding helpers.

use serde::{Deserialize, Serialize};

/// A single voxel cell.
///
/// `state` encodes occupancy: `0` is empty, `1` is a solid default-shaded
/// block, and `2..=5` are custom blocks whose mesh fragment is looked up by
/// `value`, with the yaw orientation packed into the low two bits
/// (`state - 2`). `value` is the material or custom-block index. `color` is
/// straight RGBA, untouched by detection equality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voxel {
    /// Occupancy/state byte (see type-level docs).
    pub state: u8,
    /// Material or custom-block index.
    pub value: u8,
    /// RGBA color.
    pub color: [u8; 4],
}

/// State byte for an empty cell.
pub const STATE_EMPTY: u8 = 0;
/// State byte for a solid, default-shaded block.
pub const STATE_SOLID: u8 = 1;
/// First custom-block state; orientations occupy `2..=5`.
pub const STATE_CUSTOM: u8 = 2;

impl Voxel {
    /// Packed size in bytes: state + value + RGBA.
    pub const BYTE_SIZE: usize = 6;

    /// The empty voxel (all zeroes).
    pub const EMPTY: Voxel = Voxel {
        state: STATE_EMPTY,
        value: 0,
        color: [0; 4],
    };

    /// Creates a solid voxel with the given material index and color.
    pub fn solid(value: u8, color: [u8; 4]) -> Self {
        Self {
            state: STATE_SOLID,
            value,
            color,
        }
    }

    /// Creates a custom-block voxel with a 4-way yaw orientation (`0..=3`).
    pub fn custom(value: u8, orientation: u8, color: [u8; 4]) -> Self {
        Self {
            state: STATE_CUSTOM + (orientation & 0b11),
            value,
            color,
        }
    }

    /// Returns `true` if this voxel occupies space (`state != 0`).
    pub fn is_active(&self) -> bool {
        self.state != STATE_EMPTY
    }

    /// Returns `true` if this voxel substitutes a custom mesh fragment.
    pub fn is_custom(&self) -> bool {
        self.state >= STATE_CUSTOM
    }

    /// Yaw orientation (`0..=3`) for custom blocks, `0` otherwise.
    pub fn orientation(&self) -> u8 {
        if self.is_custom() {
            (self.state - STATE_CUSTOM) & 0b11
        } else {
            0
        }
    }

    /// Detection-sense equality: `state` and `value` match, color ignored.
    pub fn matches(&self, other: &Voxel) -> bool {
        self.state == other.state && self.value == other.value
    }

    /// Appends the packed representation to `out`.
    pub fn pack_into(&self, out: &mut Vec<u8>) {
        out.push(self.state);
        out.push(self.value);
        out.extend_from_slice(&self.color);
    }

    /// Unpacks a voxel from exactly [`Voxel::BYTE_SIZE`] bytes.
    pub fn unpack(bytes: &[u8; Self::BYTE_SIZE]) -> Self {
        Self {
            state: bytes[0],
            value: bytes[1],
            color: [bytes[2], bytes[3], bytes[4], bytes[5]],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
