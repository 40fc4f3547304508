//! Optical-metrology scalars derived from fitted widths and depth.
//!
//! All lengths are micrometres. The Gaussian width `σ` enters through the
//! 1/e full width `D = 2√2·σ`.

use crate::Real;
use std::f64::consts::SQRT_2;

/// Full width at the 1/e level, `2√2·σ`.
pub fn diameter(sigma: Real) -> Real {
    2.0 * SQRT_2 * sigma
}

/// `1 − min(σx, σy) / max(σx, σy)`; zero for a circular profile.
pub fn ellipticity(sigma_x: Real, sigma_y: Real) -> Real {
    let (lo, hi) = if sigma_x <= sigma_y {
        (sigma_x, sigma_y)
    } else {
        (sigma_y, sigma_x)
    };
    1.0 - lo / hi
}

/// Apex radius of curvature `D² / (8·|depth|)` with `D = 2√2·σ`.
pub fn radius_of_curvature(sigma: Real, depth: Real) -> Real {
    let d = diameter(sigma);
    d * d / (8.0 * depth.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diameter_of_two_micron_sigma() {
        assert!((diameter(2.0) - 5.657).abs() < 1e-3);
    }

    #[test]
    fn ellipticity_of_three_by_two() {
        assert!((ellipticity(3.0, 2.0) - 1.0 / 3.0).abs() < 1e-12);
        assert!((ellipticity(2.0, 3.0) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(ellipticity(2.5, 2.5), 0.0);
    }

    #[test]
    fn radius_of_curvature_literal() {
        assert!((radius_of_curvature(2.0, 1.0) - 4.0).abs() < 1e-12);
        // sign of the depth does not matter
        assert!((radius_of_curvature(2.0, -1.0) - 4.0).abs() < 1e-12);
    }
}
