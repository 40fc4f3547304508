//! Synthetic dimple height maps (µm) on a [`PixelGrid`].

use crate::{Map2, PixelGrid, Real, SphereCap, TiltedGaussian};

use super::noise::UniformNoise;

/// Height map of a tilted Gaussian dimple plus additive noise.
pub fn gaussian_dimple(grid: &PixelGrid, model: &TiltedGaussian, noise: UniformNoise) -> Map2 {
    noise.apply(&model.render(grid))
}

/// Spherical dimple: the lower cap of `sphere`, flattened to `rim` wherever
/// the cap would rise above it or the point falls outside the footprint.
pub fn spherical_dimple(grid: &PixelGrid, sphere: &SphereCap, rim: Real) -> Map2 {
    Map2::from_fn(grid.rows, grid.cols, |r, c| {
        sphere
            .lower_z(grid.x_um(c), grid.y_um(r))
            .map_or(rim, |z| z.min(rim))
    })
}
