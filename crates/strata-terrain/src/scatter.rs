//! Deterministic per-coordinate random fill.
//!
//! Each lattice coordinate derives its own RNG from the world seed, so the
//! same cell always generates the same result regardless of chunk iteration
//! order or thread scheduling.

use std::hash::{DefaultHasher, Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use strata_voxel::{Voxel, VoxelDataGenerator};

/// Fills a fraction of cells at random, stable per seed and coordinate.
#[derive(Clone, Debug)]
pub struct ScatterGenerator {
    seed: u64,
    /// Fraction of cells that become solid, in `[0, 1]`.
    pub density: f32,
    /// Material value for filled cells.
    pub value: u8,
    /// Color for filled cells.
    pub color: [u8; 4],
}

impl ScatterGenerator {
    /// Creates a generator with the given seed and fill density.
    pub fn new(seed: u64, density: f32) -> Self {
        Self {
            seed,
            density,
            value: 0,
            color: [255; 4],
        }
    }

    fn coordinate_rng(&self, x: i32, y: i32, z: i32) -> ChaCha8Rng {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        x.hash(&mut hasher);
        y.hash(&mut hasher);
        z.hash(&mut hasher);
        ChaCha8Rng::seed_from_u64(hasher.finish())
    }
}

impl VoxelDataGenerator for ScatterGenerator {
    fn generate_voxel(&self, x: i32, y: i32, z: i32) -> Voxel {
        let mut rng = self.coordinate_rng(x, y, z);
        if rng.random::<f32>() < self.density {
            Voxel::solid(self.value, self.color)
        } else {
            Voxel::EMPTY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_coordinate_is_stable() {
        let generator = ScatterGenerator::new(5, 0.5);
        for i in -20..20 {
            assert_eq!(
                generator.generate_voxel(i, 2 * i, -i),
                generator.generate_voxel(i, 2 * i, -i)
            );
        }
    }

    #[test]
    fn test_density_extremes() {
        let empty = ScatterGenerator::new(1, 0.0);
        let full = ScatterGenerator::new(1, 1.0);
        for i in 0..50 {
            assert!(!empty.generate_voxel(i, 0, 0).is_active());
            assert!(full.generate_voxel(i, 0, 0).is_active());
        }
    }

    #[test]
    fn test_density_roughly_respected() {
        let generator = ScatterGenerator::new(3, 0.25);
        let total = 4096;
        let mut active = 0;
        for i in 0..total {
            if generator.generate_voxel(i, i / 7, i / 13).is_active() {
                active += 1;
            }
        }
        let fraction = active as f32 / total as f32;
        assert!((0.15..0.35).contains(&fraction), "fraction {fraction}");
    }
}
