//! Tilted elliptical Gaussian on a planar background.
//!
//! Parameter vector `[A, x0, y0, σx, σy, θ, offset, tilt_x, tilt_y]`, lengths
//! in micrometres. After solving, the result is canonicalised so that
//! `σx ≥ σy` and θ lies in the range selected by [`ThetaConvention`].

use std::f64::consts::{FRAC_PI_2, PI};

use fdms_core::{
    diameter, ellipticity, finite_std_dev, gaussian_coefficients, radius_of_curvature,
    AnalysisError, Map2, PixelGrid, Real, TiltedGaussian,
};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::covariance::{covariance_at, flip_signs, std_errors, swap_params};
use crate::problems::collect_points;
use crate::{LmBackend, NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

const PROBLEM: &str = "tilted Gaussian";
const NUM_PARAMS: usize = 9;

/// Range θ is wrapped into after the σ swap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThetaConvention {
    /// `[0, π/2)`. A θ outside this range is shifted by multiples of π/2,
    /// which keeps the ellipse axes but not which of them is labelled x.
    #[default]
    QuarterTurn,
    /// `[0, π)`. Always an exact re-parameterisation of the fitted surface.
    HalfTurn,
}

impl ThetaConvention {
    pub fn wrap(self, theta: Real) -> Real {
        match self {
            ThetaConvention::QuarterTurn => theta.rem_euclid(FRAC_PI_2),
            ThetaConvention::HalfTurn => theta.rem_euclid(PI),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianFitOptions {
    pub solve: SolveOptions,
    pub theta_convention: ThetaConvention,
}

/// Canonical tilted-Gaussian fit with derived metrology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianFitResult {
    /// Canonical parameters (`σx ≥ σy`).
    pub model: TiltedGaussian,
    /// 9×9 covariance in canonical parameter order.
    pub covariance: DMatrix<Real>,
    /// Centre `(col, row)` in detector pixels.
    pub centroid_px: (Real, Real),
    /// `data − model` on the fit grid.
    pub residuals: Map2,
    pub residual_std: Real,
    pub report: SolveReport,
    /// Set when wrapping θ moved it by an odd number of quarter turns on an
    /// elliptical fit: `sigma_x` then lies along `theta + 90°` on the
    /// measured surface, so the canonical parameters do not render it.
    #[serde(default)]
    pub axes_relabelled: bool,
}

impl GaussianFitResult {
    /// Signed dimple depth (µm), the fitted amplitude.
    pub fn depth(&self) -> Real {
        self.model.amplitude
    }

    pub fn diameter_x(&self) -> Real {
        diameter(self.model.sigma_x)
    }

    pub fn diameter_y(&self) -> Real {
        diameter(self.model.sigma_y)
    }

    pub fn ellipticity(&self) -> Real {
        ellipticity(self.model.sigma_x, self.model.sigma_y)
    }

    pub fn roc_x(&self) -> Real {
        radius_of_curvature(self.model.sigma_x, self.depth())
    }

    pub fn roc_y(&self) -> Real {
        radius_of_curvature(self.model.sigma_y, self.depth())
    }

    /// Mean of the two curvature radii; seeds the sphere fit.
    pub fn roc_mean(&self) -> Real {
        0.5 * (self.roc_x() + self.roc_y())
    }

    pub fn theta_deg(&self) -> Real {
        self.model.theta.to_degrees()
    }

    /// One-sigma parameter uncertainties in canonical order.
    pub fn std_errors(&self) -> DVector<Real> {
        std_errors(&self.covariance)
    }
}

struct GaussianTiltProblem {
    xs: Vec<Real>,
    ys: Vec<Real>,
    zs: Vec<Real>,
}

fn model_from(p: &DVector<Real>) -> TiltedGaussian {
    TiltedGaussian {
        amplitude: p[0],
        x0: p[1],
        y0: p[2],
        sigma_x: p[3],
        sigma_y: p[4],
        theta: p[5],
        offset: p[6],
        tilt_x: p[7],
        tilt_y: p[8],
    }
}

fn params_from(m: &TiltedGaussian) -> DVector<Real> {
    DVector::from_vec(vec![
        m.amplitude,
        m.x0,
        m.y0,
        m.sigma_x,
        m.sigma_y,
        m.theta,
        m.offset,
        m.tilt_x,
        m.tilt_y,
    ])
}

impl NllsProblem for GaussianTiltProblem {
    fn num_params(&self) -> usize {
        NUM_PARAMS
    }

    fn num_residuals(&self) -> usize {
        self.zs.len()
    }

    fn residuals(&self, p: &DVector<Real>) -> DVector<Real> {
        let m = model_from(p);
        DVector::from_iterator(
            self.zs.len(),
            self.xs
                .iter()
                .zip(&self.ys)
                .zip(&self.zs)
                .map(|((&x, &y), &z)| m.eval(x, y) - z),
        )
    }

    fn jacobian(&self, p: &DVector<Real>) -> DMatrix<Real> {
        let m = model_from(p);
        let (a, b, c) = gaussian_coefficients(m.sigma_x, m.sigma_y, m.theta);
        let (sin_t, cos_t) = m.theta.sin_cos();
        let (sin_2t, cos_2t) = (2.0 * m.theta).sin_cos();
        let sx2 = m.sigma_x * m.sigma_x;
        let sy2 = m.sigma_y * m.sigma_y;
        let sx3 = sx2 * m.sigma_x;
        let sy3 = sy2 * m.sigma_y;

        // partial derivatives of (a, b, c)
        let d_sx = (-cos_t * cos_t / sx3, sin_2t / (2.0 * sx3), -sin_t * sin_t / sx3);
        let d_sy = (-sin_t * sin_t / sy3, -sin_2t / (2.0 * sy3), -cos_t * cos_t / sy3);
        let d_th = (
            -sin_2t / (2.0 * sx2) + sin_2t / (2.0 * sy2),
            -cos_2t / (2.0 * sx2) + cos_2t / (2.0 * sy2),
            sin_2t / (2.0 * sx2) - sin_2t / (2.0 * sy2),
        );

        let mut j = DMatrix::zeros(self.zs.len(), NUM_PARAMS);
        for (i, (&x, &y)) in self.xs.iter().zip(&self.ys).enumerate() {
            let dx = x - m.x0;
            let dy = y - m.y0;
            let e = (-(a * dx * dx + 2.0 * b * dx * dy + c * dy * dy)).exp();
            let ae = m.amplitude * e;
            let dq = |(da, db, dc): (Real, Real, Real)| da * dx * dx + 2.0 * db * dx * dy + dc * dy * dy;

            j[(i, 0)] = e;
            j[(i, 1)] = ae * (2.0 * a * dx + 2.0 * b * dy);
            j[(i, 2)] = ae * (2.0 * b * dx + 2.0 * c * dy);
            j[(i, 3)] = -ae * dq(d_sx);
            j[(i, 4)] = -ae * dq(d_sy);
            j[(i, 5)] = -ae * dq(d_th);
            j[(i, 6)] = 1.0;
            j[(i, 7)] = x;
            j[(i, 8)] = y;
        }
        j
    }
}

/// Fit a tilted Gaussian to `height` (µm) on `grid` starting from `seed`.
///
/// Non-convergence and an ill-conditioned solution are fit-convergence
/// errors; there is no automatic retry.
pub fn fit_tilted_gaussian(
    height: &Map2,
    grid: &PixelGrid,
    seed: &TiltedGaussian,
    opts: &GaussianFitOptions,
) -> Result<GaussianFitResult, AnalysisError> {
    AnalysisError::check_positive("seed sigma_x", seed.sigma_x.abs())?;
    AnalysisError::check_positive("seed sigma_y", seed.sigma_y.abs())?;
    let (xs, ys, zs) = collect_points(height, grid, "height map", |_, _| true)?;
    if zs.len() <= NUM_PARAMS {
        return Err(AnalysisError::TooFewPoints {
            what: PROBLEM,
            required: NUM_PARAMS + 1,
            available: zs.len(),
        });
    }

    let problem = GaussianTiltProblem { xs, ys, zs };
    let (p, report) = LmBackend.solve(&problem, params_from(seed), &opts.solve);
    if !report.converged || p.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::FitDidNotConverge {
            problem: PROBLEM,
            reason: report.termination,
        });
    }
    let mut covariance = covariance_at(&problem, &p, PROBLEM)?;

    let fitted = model_from(&p);
    let residuals = Map2::from_fn(grid.rows, grid.cols, |r, c| {
        height[(r, c)] - fitted.eval(grid.x_um(c), grid.y_um(r))
    });
    let residual_std = finite_std_dev(&residuals);

    let (model, axes_relabelled) = canonicalize(fitted, &mut covariance, opts.theta_convention);
    if axes_relabelled {
        warn!(
            "theta wrapped by an odd quarter turn: sigma_x lies along theta + 90 deg on the \
             measured surface; use the half_turn convention for a faithful parameterisation"
        );
    }
    let centroid_px = grid.to_detector_px(model.x0, model.y0);

    info!(
        "{PROBLEM} fit: depth {:.4} um, sigma ({:.4}, {:.4}) um, theta {:.2} deg, residual std {:.2e} um",
        model.amplitude,
        model.sigma_x,
        model.sigma_y,
        model.theta.to_degrees(),
        residual_std
    );

    Ok(GaussianFitResult {
        model,
        covariance,
        centroid_px,
        residuals,
        residual_std,
        report,
        axes_relabelled,
    })
}

/// Make the widths positive with `σx ≥ σy` and wrap θ.
///
/// The covariance is transformed alongside the parameters. The flag is set
/// when the wrap swapped which ellipse axis the widths describe.
fn canonicalize(
    mut m: TiltedGaussian,
    cov: &mut DMatrix<Real>,
    convention: ThetaConvention,
) -> (TiltedGaussian, bool) {
    let mut signs = [1.0; NUM_PARAMS];
    if m.sigma_x < 0.0 {
        signs[3] = -1.0;
        m.sigma_x = -m.sigma_x;
    }
    if m.sigma_y < 0.0 {
        signs[4] = -1.0;
        m.sigma_y = -m.sigma_y;
    }
    flip_signs(cov, &signs);

    if m.sigma_x < m.sigma_y {
        debug!(
            "swapping sigma_x {:.4} < sigma_y {:.4}, rotating theta by 90 deg",
            m.sigma_x, m.sigma_y
        );
        std::mem::swap(&mut m.sigma_x, &mut m.sigma_y);
        m.theta += FRAC_PI_2;
        swap_params(cov, 3, 4);
    }
    let unwrapped = m.theta;
    m.theta = convention.wrap(unwrapped);
    let quarter_turns = ((unwrapped - m.theta) / FRAC_PI_2).round() as i64;
    let relabelled = quarter_turns.rem_euclid(2) == 1 && m.sigma_x != m.sigma_y;
    (m, relabelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jacobian_matches_finite_differences() {
        let grid = PixelGrid::new(7, 9, 0.3).unwrap();
        let (xs, ys, zs): (Vec<_>, Vec<_>, Vec<_>) = {
            let mut out = (Vec::new(), Vec::new(), Vec::new());
            for (_, _, x, y) in grid.points() {
                out.0.push(x);
                out.1.push(y);
                out.2.push(0.0);
            }
            out
        };
        let problem = GaussianTiltProblem { xs, ys, zs };
        let p = DVector::from_vec(vec![-0.7, 0.1, -0.2, 0.9, 0.6, 0.5, 0.03, 0.01, -0.02]);
        let j = problem.jacobian(&p);

        let h = 1e-6;
        for k in 0..NUM_PARAMS {
            let mut hi = p.clone();
            let mut lo = p.clone();
            hi[k] += h;
            lo[k] -= h;
            let fd = (problem.residuals(&hi) - problem.residuals(&lo)) / (2.0 * h);
            let err = (fd - j.column(k)).amax();
            assert!(err < 1e-6, "column {k}: max error {err}");
        }
    }

    #[test]
    fn canonicalize_swaps_axes_and_covariance() {
        let m = TiltedGaussian {
            amplitude: -1.0,
            x0: 0.0,
            y0: 0.0,
            sigma_x: 1.0,
            sigma_y: -2.0,
            theta: 0.3,
            offset: 0.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
        };
        let mut cov = DMatrix::from_diagonal(&DVector::from_vec(vec![
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0,
        ]));
        cov[(3, 4)] = 0.5;
        cov[(4, 3)] = 0.5;

        let (out, relabelled) = canonicalize(m, &mut cov, ThetaConvention::HalfTurn);
        assert!(!relabelled);
        assert_eq!((out.sigma_x, out.sigma_y), (2.0, 1.0));
        assert!((out.theta - (0.3 + FRAC_PI_2)).abs() < 1e-12);
        assert_eq!(cov[(3, 3)], 5.0);
        assert_eq!(cov[(4, 4)], 4.0);
        assert_eq!(cov[(3, 4)], -0.5);

        // same surface after canonicalisation
        let mut orig = m;
        orig.sigma_y = 2.0;
        for &(x, y) in &[(0.5, 0.2), (-1.0, 1.5), (2.0, -0.7)] {
            assert!((orig.eval(x, y) - out.eval(x, y)).abs() < 1e-12);
        }

        let mut cov = DMatrix::identity(9, 9);
        let (out, relabelled) = canonicalize(m, &mut cov, ThetaConvention::QuarterTurn);
        assert!((out.theta - 0.3).abs() < 1e-12);
        assert!(relabelled);
        assert!((orig.eval(0.5, 0.2) - out.eval(0.5, 0.2)).abs() > 1e-3);
    }

    #[test]
    fn half_turn_shifts_keep_the_axis_labels() {
        let m = TiltedGaussian {
            amplitude: -1.0,
            x0: 0.0,
            y0: 0.0,
            sigma_x: 2.0,
            sigma_y: 1.0,
            theta: 0.4 + PI,
            offset: 0.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
        };
        for convention in [ThetaConvention::QuarterTurn, ThetaConvention::HalfTurn] {
            let mut cov = DMatrix::identity(9, 9);
            let (out, relabelled) = canonicalize(m, &mut cov, convention);
            assert!(!relabelled, "{convention:?}");
            assert!((out.theta - 0.4).abs() < 1e-12);
        }

        // a circular fit has no axis to mislabel
        let round = TiltedGaussian {
            sigma_y: 2.0,
            theta: 2.0,
            ..m
        };
        let mut cov = DMatrix::identity(9, 9);
        let (_, relabelled) = canonicalize(round, &mut cov, ThetaConvention::QuarterTurn);
        assert!(!relabelled);
    }

    #[test]
    fn theta_conventions_wrap_into_range() {
        for t in [-3.0, -0.1, 0.0, 1.0, 1.6, 3.5, 7.0] {
            let q = ThetaConvention::QuarterTurn.wrap(t);
            assert!((0.0..FRAC_PI_2).contains(&q), "{t} -> {q}");
            let h = ThetaConvention::HalfTurn.wrap(t);
            assert!((0.0..PI).contains(&h), "{t} -> {h}");
        }
    }

    #[test]
    fn options_roundtrip_through_json() {
        let opts = GaussianFitOptions {
            theta_convention: ThetaConvention::HalfTurn,
            ..Default::default()
        };
        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("half_turn"));
        let back: GaussianFitOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
        let partial: GaussianFitOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(partial, GaussianFitOptions::default());
    }
}
