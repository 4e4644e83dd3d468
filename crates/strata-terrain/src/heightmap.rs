//! Multi-octave fractal Brownian motion heightmap sampler.
//!
//! Composites octaves of simplex noise into natural-looking terrain heights,
//! deterministic per seed.

use noise::{NoiseFn, Simplex};

/// Configuration for the fBm heightmap.
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    /// World seed.
    pub seed: u32,
    /// Number of octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Frequency of the first octave.
    pub base_frequency: f64,
    /// Amplitude of the first octave, in voxel units.
    pub amplitude: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.02,
            amplitude: 16.0,
        }
    }
}

/// Samples terrain height values from layered simplex noise.
pub struct HeightmapSampler {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapSampler {
    /// Creates a sampler for the given parameters.
    pub fn new(params: HeightmapParams) -> Self {
        Self {
            noise: Simplex::new(params.seed),
            params,
        }
    }

    /// Samples the raw height at a 2D world coordinate.
    ///
    /// The range is roughly `[-max_amplitude, +max_amplitude]`.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;
        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }
        total
    }

    /// Samples the height normalized into `[0, 1]`.
    pub fn sample_normalized(&self, x: f64, z: f64) -> f64 {
        let max = self.max_amplitude();
        ((self.sample(x, z) / max) + 1.0) * 0.5
    }

    /// Geometric sum of all octave amplitudes.
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amplitude = self.params.amplitude;
        for _ in 0..self.params.octaves {
            sum += amplitude;
            amplitude *= self.params.persistence;
        }
        sum
    }
}
