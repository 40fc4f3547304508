//! Deterministic additive noise for synthetic maps.
//!
//! The noise avoids `thread_rng` and any RNG crate so synthetic surfaces are
//! stable across versions and platforms.

use crate::{Map2, Real};

/// Deterministic uniform noise in `[-amplitude, +amplitude]` keyed by pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformNoise {
    /// Base seed selecting the pseudo-random sequence.
    pub seed: u64,
    /// Maximum absolute deviation.
    pub amplitude: Real,
}

impl UniformNoise {
    pub fn new(seed: u64, amplitude: Real) -> Self {
        Self { seed, amplitude }
    }

    /// Sample the noise value for `(row, col)`.
    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> Real {
        let amp = self.amplitude.abs();
        if amp == 0.0 {
            return 0.0;
        }
        let u = u64_to_unit_f64(splitmix64(mix_key(self.seed, row, col)));
        (u - 0.5) * 2.0 * amp
    }

    /// Return `map` with noise added to every entry.
    pub fn apply(&self, map: &Map2) -> Map2 {
        Map2::from_fn(map.nrows(), map.ncols(), |r, c| map[(r, c)] + self.sample(r, c))
    }
}

#[inline]
fn mix_key(seed: u64, row: usize, col: usize) -> u64 {
    seed ^ (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (col as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn u64_to_unit_f64(x: u64) -> Real {
    // top 53 bits -> [0, 1)
    (x >> 11) as Real * (1.0 / ((1u64 << 53) as Real))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_deterministic_and_bounded() {
        let noise = UniformNoise::new(7, 0.01);
        assert_eq!(noise.sample(3, 4), noise.sample(3, 4));
        assert_ne!(noise.sample(3, 4), noise.sample(4, 3));
        let map = noise.apply(&Map2::zeros(20, 20));
        assert!(map.iter().all(|v| v.abs() <= 0.01));
        let mean = map.iter().sum::<Real>() / 400.0;
        assert!(mean.abs() < 0.003, "mean {mean}");
    }

    #[test]
    fn zero_amplitude_is_silent() {
        assert_eq!(UniformNoise::default().sample(1, 2), 0.0);
    }
}
