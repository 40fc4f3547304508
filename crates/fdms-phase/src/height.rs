//! Unwrapped phase to corner-zeroed height.
//!
//! `height_µm = sign · φ / 2π · (λ / 2) · 1e6`, then the mean of the four
//! corner-block means is subtracted so the undisturbed fibre face sits at
//! zero. "Bottom" corners are the low row indices.

use std::f64::consts::PI;

use fdms_core::{block_mean, mean, AnalysisError, HeightSign, Map2, Real};

/// Side of the square corner blocks: `⌊rows / 10⌋`, at least one pixel and
/// never wider than the map.
pub fn corner_block_size(rows: usize, cols: usize) -> usize {
    (rows / 10).max(1).min(rows).min(cols)
}

/// Means of the four `bs × bs` corner blocks of a map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerMeans {
    pub bottom_left: Real,
    pub bottom_right: Real,
    pub top_left: Real,
    pub top_right: Real,
}

impl CornerMeans {
    pub fn of(map: &Map2, bs: usize) -> Result<Self, AnalysisError> {
        let (rows, cols) = map.shape();
        if rows == 0 || cols == 0 {
            return Err(AnalysisError::EmptyMap { what: "height map" });
        }
        let bs = bs.max(1).min(rows).min(cols);
        let (hi_r, hi_c) = (rows - bs, cols - bs);
        Ok(Self {
            bottom_left: block_mean(map, 0, 0, bs, bs),
            bottom_right: block_mean(map, 0, hi_c, bs, bs),
            top_left: block_mean(map, hi_r, 0, bs, bs),
            top_right: block_mean(map, hi_r, hi_c, bs, bs),
        })
    }

    pub fn mean(&self) -> Real {
        mean([
            self.bottom_left,
            self.bottom_right,
            self.top_left,
            self.top_right,
        ])
    }
}

/// Scale unwrapped phase (rad) to height (µm) without zeroing.
pub fn phase_to_height(unwrapped: &Map2, wavelength_m: Real, sign: HeightSign) -> Map2 {
    let um_per_rad = sign.factor() * wavelength_m / 2.0 * 1e6 / (2.0 * PI);
    unwrapped * um_per_rad
}

/// Subtract the mean of the corner-block means.
pub fn zero_corners(map: &Map2) -> Result<Map2, AnalysisError> {
    let bs = corner_block_size(map.nrows(), map.ncols());
    let level = CornerMeans::of(map, bs)?.mean();
    Ok(map.add_scalar(-level))
}

/// Unwrapped phase to corner-zeroed height map (µm).
pub fn height_map(
    unwrapped: &Map2,
    wavelength_m: Real,
    sign: HeightSign,
) -> Result<Map2, AnalysisError> {
    AnalysisError::check_positive("wavelength_m", wavelength_m)?;
    zero_corners(&phase_to_height(unwrapped, wavelength_m, sign))
}
