//! Seed for the tilted-Gaussian fit from corner statistics and D4σ moments.

use fdms_core::{block_mean, mean, Map2, PixelGrid, Real, TiltedGaussian};
use log::{debug, warn};

use crate::height::{corner_block_size, CornerMeans};
use crate::moments::d4sigma;

/// Width used when the moment estimate is unusable (µm).
pub const FALLBACK_SIGMA_UM: Real = 3.0;

/// Fit seed plus the diagnostics logged while estimating it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialGuess {
    /// Seed parameters with `theta = 0`.
    pub model: TiltedGaussian,
    /// `model.tilt_x` in mrad.
    pub tilt_x_mrad: Real,
    /// `model.tilt_y` in mrad.
    pub tilt_y_mrad: Real,
    /// Set when the moment widths or centre were replaced by defaults.
    pub used_fallback: bool,
}

/// Estimate a fit seed from a corner-zeroed height map.
///
/// Never fails: degenerate input (flat maps, `NaN`, empty maps) produces
/// the documented defaults with [`InitialGuess::used_fallback`] set, and no
/// `NaN` is ever returned. Only `grid.scale_um` is read from `grid`; the
/// coordinate frame follows the shape of `height`.
pub fn estimate_initial_guess(height: &Map2, grid: &PixelGrid) -> InitialGuess {
    let grid = PixelGrid {
        rows: height.nrows(),
        cols: height.ncols(),
        ..*grid
    };
    let mut used_fallback = false;
    let mut finite_or_zero = |v: Real| {
        if v.is_finite() {
            v
        } else {
            used_fallback = true;
            0.0
        }
    };

    let bs = corner_block_size(grid.rows, grid.cols);
    let corners = CornerMeans::of(height, bs).ok();
    let (offset, tilt_x, tilt_y) = match corners {
        Some(cm) => {
            let (width_um, height_um) = grid.extent_um();
            let right = mean([cm.bottom_right, cm.top_right]);
            let left = mean([cm.bottom_left, cm.top_left]);
            let top = mean([cm.top_left, cm.top_right]);
            let bottom = mean([cm.bottom_left, cm.bottom_right]);
            (
                finite_or_zero(cm.mean()),
                finite_or_zero((right - left) / width_um),
                finite_or_zero((top - bottom) / height_um),
            )
        }
        None => (finite_or_zero(Real::NAN), 0.0, 0.0),
    };

    let plane = TiltedGaussian {
        amplitude: 0.0,
        x0: 0.0,
        y0: 0.0,
        sigma_x: 1.0,
        sigma_y: 1.0,
        theta: 0.0,
        offset,
        tilt_x,
        tilt_y,
    };
    let detrended = Map2::from_fn(grid.rows, grid.cols, |r, c| {
        height[(r, c)] - plane.plane(grid.x_um(c), grid.y_um(r))
    });

    let amplitude = finite_or_zero(dimple_amplitude(&detrended, bs));
    let oriented = if amplitude < 0.0 { -&detrended } else { detrended };
    let moments = d4sigma(&oriented);

    let (x0, y0, sigma_x, sigma_y) = if moments.is_usable() {
        let (x0, y0) = grid.map_px_to_um(moments.centroid_col, moments.centroid_row);
        (
            x0,
            y0,
            moments.d4sigma_col * grid.scale_um / 8.0,
            moments.d4sigma_row * grid.scale_um / 8.0,
        )
    } else {
        used_fallback = true;
        (0.0, 0.0, FALLBACK_SIGMA_UM, FALLBACK_SIGMA_UM)
    };

    let guess = InitialGuess {
        model: TiltedGaussian {
            amplitude,
            x0,
            y0,
            sigma_x,
            sigma_y,
            ..plane
        },
        tilt_x_mrad: tilt_x * 1e3,
        tilt_y_mrad: tilt_y * 1e3,
        used_fallback,
    };

    if used_fallback {
        warn!(
            "initial guess fell back to defaults (sigma = {} um, centre at map origin)",
            FALLBACK_SIGMA_UM
        );
    }
    debug!(
        "initial guess: amplitude {:.4} um, centre ({:.3}, {:.3}) um, sigma ({:.3}, {:.3}) um, \
         offset {:.4} um, tilt ({:.3}, {:.3}) mrad",
        guess.model.amplitude,
        guess.model.x0,
        guess.model.y0,
        guess.model.sigma_x,
        guess.model.sigma_y,
        guess.model.offset,
        guess.tilt_x_mrad,
        guess.tilt_y_mrad
    );
    guess
}

/// Extremum of the detrended map relative to its corner level.
///
/// The deepest point wins for a dimple; a bump wins only when it deviates
/// further from the corners than any dip.
fn dimple_amplitude(detrended: &Map2, bs: usize) -> Real {
    let (rows, cols) = detrended.shape();
    if rows == 0 || cols == 0 {
        return Real::NAN;
    }
    let (hi_r, hi_c) = (rows - bs, cols - bs);
    let level = mean([
        block_mean(detrended, 0, 0, bs, bs),
        block_mean(detrended, 0, hi_c, bs, bs),
        block_mean(detrended, hi_r, 0, bs, bs),
        block_mean(detrended, hi_r, hi_c, bs, bs),
    ]);
    let dip = detrended.min() - level;
    let bump = detrended.max() - level;
    if bump > -dip {
        bump
    } else {
        dip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdms_core::synthetic::{gaussian_dimple, UniformNoise};

    fn grid() -> PixelGrid {
        PixelGrid::new(60, 70, 0.1).unwrap()
    }

    fn truth() -> TiltedGaussian {
        TiltedGaussian {
            amplitude: -0.6,
            x0: 0.3,
            y0: -0.2,
            sigma_x: 0.8,
            sigma_y: 0.6,
            theta: 0.0,
            offset: 0.02,
            tilt_x: 0.004,
            tilt_y: -0.003,
        }
    }

    #[test]
    fn guess_lands_near_a_dimple() {
        let g = truth();
        let map = gaussian_dimple(&grid(), &g, UniformNoise::default());
        let guess = estimate_initial_guess(&map, &grid());
        assert!(!guess.used_fallback);
        assert!((guess.model.amplitude - g.amplitude).abs() < 0.05);
        assert!((guess.model.x0 - g.x0).abs() < 0.1, "{}", guess.model.x0);
        assert!((guess.model.y0 - g.y0).abs() < 0.1, "{}", guess.model.y0);
        assert!((guess.model.tilt_x - g.tilt_x).abs() < 1e-3);
        assert!((guess.model.tilt_y - g.tilt_y).abs() < 1e-3);
        assert!((guess.tilt_x_mrad - 1e3 * guess.model.tilt_x).abs() < 1e-12);
        assert!(guess.model.sigma_x > 0.0 && guess.model.sigma_y > 0.0);
        assert!(guess.model.sigma_x > guess.model.sigma_y);
        assert_eq!(guess.model.theta, 0.0);
    }

    #[test]
    fn bump_gives_positive_amplitude() {
        let g = TiltedGaussian {
            amplitude: 0.5,
            ..truth()
        };
        let map = gaussian_dimple(&grid(), &g, UniformNoise::default());
        let guess = estimate_initial_guess(&map, &grid());
        assert!((guess.model.amplitude - 0.5).abs() < 0.05);
        assert!((guess.model.x0 - g.x0).abs() < 0.1);
    }

    #[test]
    fn dip_wins_unless_a_bump_deviates_further() {
        let dimple = gaussian_dimple(&grid(), &truth(), UniformNoise::default());
        let debris = TiltedGaussian {
            amplitude: 0.2,
            x0: -1.8,
            y0: 1.4,
            sigma_x: 0.25,
            sigma_y: 0.25,
            offset: 0.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            ..truth()
        };
        let map = dimple + gaussian_dimple(&grid(), &debris, UniformNoise::default());
        let guess = estimate_initial_guess(&map, &grid());
        assert!((guess.model.amplitude + 0.6).abs() < 0.05, "{}", guess.model.amplitude);

        // equal excursions resolve to the dip
        let mut map = Map2::zeros(20, 20);
        map[(10, 10)] = -0.3;
        map[(5, 12)] = 0.3;
        let bs = corner_block_size(20, 20);
        assert_eq!(dimple_amplitude(&map, bs), -0.3);
        map[(5, 12)] = 0.31;
        assert_eq!(dimple_amplitude(&map, bs), 0.31);
    }

    #[test]
    fn flat_surface_falls_back() {
        let guess = estimate_initial_guess(&Map2::zeros(10, 10), &grid());
        assert!(guess.used_fallback);
        assert_eq!(guess.model.sigma_x, FALLBACK_SIGMA_UM);
        assert_eq!(guess.model.sigma_y, FALLBACK_SIGMA_UM);
        assert_eq!((guess.model.x0, guess.model.y0), (0.0, 0.0));
    }

    #[test]
    fn nan_input_never_leaks_nan() {
        let mut map = Map2::zeros(12, 12);
        map[(0, 0)] = Real::NAN;
        let guess = estimate_initial_guess(&map, &grid());
        assert!(guess.used_fallback);
        let m = guess.model;
        for v in [m.amplitude, m.x0, m.y0, m.sigma_x, m.sigma_y, m.offset, m.tilt_x, m.tilt_y] {
            assert!(v.is_finite());
        }

        let guess = estimate_initial_guess(&Map2::zeros(0, 0), &grid());
        assert!(guess.used_fallback);
        assert!(guess.model.sigma_x.is_finite());
    }
}
