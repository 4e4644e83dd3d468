//! Layered heightmap terrain generator with bedrock and tree seeding.

use noise::{NoiseFn, Simplex};
use strata_voxel::{Voxel, VoxelDataGenerator};

use crate::heightmap::{HeightmapParams, HeightmapSampler};

/// Tunables for [`TerrainGenerator`].
#[derive(Clone, Debug)]
pub struct TerrainParams {
    /// Lowest surface height in voxel units.
    pub height_min: i32,
    /// Highest surface height in voxel units.
    pub height_max: i32,
    /// Everything at or below this height is bedrock.
    pub bedrock_height: i32,
    /// Material value for the top surface layer.
    pub surface_value: u8,
    /// Material value below the surface layer.
    pub subsurface_value: u8,
    /// Material value for bedrock.
    pub bedrock_value: u8,
    /// Whether to seed tree trunks on the surface.
    pub trees: bool,
    /// Tree-channel threshold in `[0, 1]`; higher means sparser trees.
    pub tree_threshold: f64,
    /// Height of a seeded trunk in voxels.
    pub tree_height: i32,
    /// Material value marking trunk voxels (picked up by the tree processor).
    pub tree_trunk_value: u8,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            height_min: 4,
            height_max: 44,
            bedrock_height: -32,
            surface_value: 1,
            subsurface_value: 2,
            bedrock_value: 4,
            trees: true,
            tree_threshold: 0.9,
            tree_height: 5,
            tree_trunk_value: 3,
        }
    }
}

/// Heightmap-driven terrain: bedrock floor, stone body, surface layer, and
/// optional tree trunks seeded from a second noise channel.
pub struct TerrainGenerator {
    sampler: HeightmapSampler,
    tree_noise: Simplex,
    params: TerrainParams,
}

impl TerrainGenerator {
    /// Creates a generator from a world seed with default parameters.
    pub fn new(seed: u32) -> Self {
        Self::with_params(seed, TerrainParams::default())
    }

    /// Creates a generator with explicit parameters.
    pub fn with_params(seed: u32, params: TerrainParams) -> Self {
        Self {
            sampler: HeightmapSampler::new(HeightmapParams {
                seed,
                ..Default::default()
            }),
            tree_noise: Simplex::new(seed.wrapping_add(1)),
            params,
        }
    }

    /// Surface height of the column at `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let span = (self.params.height_max - self.params.height_min) as f64;
        let t = self.sampler.sample_normalized(x as f64, z as f64);
        self.params.height_min + (t * span) as i32
    }

    fn tree_channel(&self, x: i32, z: i32) -> f64 {
        let value = self.tree_noise.get([x as f64 * 0.5, z as f64 * 0.5]);
        (value + 1.0) * 0.5
    }
}

impl VoxelDataGenerator for TerrainGenerator {
    fn generate_voxel(&self, x: i32, y: i32, z: i32) -> Voxel {
        if y <= self.params.bedrock_height {
            return Voxel::solid(self.params.bedrock_value, [255; 4]);
        }

        let surface = self.surface_height(x, z);
        if y < surface {
            let value = if y + 1 >= surface {
                self.params.surface_value
            } else {
                self.params.subsurface_value
            };
            return Voxel::solid(value, [255; 4]);
        }

        if self.params.trees
            && y < surface + self.params.tree_height
            && self.tree_channel(x, z) >= self.params.tree_threshold
        {
            return Voxel::solid(self.params.tree_trunk_value, [255; 4]);
        }

        Voxel::EMPTY
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bedrock_below_floor() {
        let generator = TerrainGenerator::new(7);
        let voxel = generator.generate_voxel(0, -40, 0);
        assert!(voxel.is_active());
        assert_eq!(voxel.value, TerrainParams::default().bedrock_value);
    }

    #[test]
    fn test_column_is_solid_below_surface_and_empty_above() {
        let generator = TerrainGenerator::new(7);
        let surface = generator.surface_height(10, 10);
        assert!(generator.generate_voxel(10, surface - 1, 10).is_active());
        assert!(generator.generate_voxel(10, surface - 5, 10).is_active());
        // Well above the tallest possible tree: always empty.
        let params = TerrainParams::default();
        assert!(!generator
            .generate_voxel(10, surface + params.tree_height + 1, 10)
            .is_active());
    }

    #[test]
    fn test_surface_layer_uses_surface_material() {
        let generator = TerrainGenerator::new(7);
        let params = TerrainParams::default();
        let surface = generator.surface_height(3, -8);
        assert_eq!(generator.generate_voxel(3, surface - 1, -8).value, params.surface_value);
        if surface - 3 > params.bedrock_height {
            assert_eq!(
                generator.generate_voxel(3, surface - 3, -8).value,
                params.subsurface_value
            );
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = TerrainGenerator::new(42);
        let b = TerrainGenerator::new(42);
        for i in -16..16 {
            assert_eq!(
                a.generate_voxel(i, i / 2, -i),
                b.generate_voxel(i, i / 2, -i)
            );
        }
    }

    #[test]
    fn test_surface_height_stays_in_band() {
        let generator = TerrainGenerator::new(99);
        let params = TerrainParams::default();
        for x in -32..32 {
            for z in -32..32 {
                let h = generator.surface_height(x, z);
                assert!(h >= params.height_min && h <= params.height_max);
            }
        }
    }

    #[test]
    fn test_trees_can_be_disabled() {
        let params = TerrainParams {
            trees: false,
            ..Default::default()
        };
        let generator = TerrainGenerator::with_params(7, params.clone());
        for x in -64..64 {
            let surface = generator.surface_height(x, 0);
            let above = generator.generate_voxel(x, surface, 0);
            assert!(!above.is_active(), "unexpected trunk at x={x}");
        }
    }
}
