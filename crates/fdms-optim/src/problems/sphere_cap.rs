//! Sphere through the height samples inside the Gaussian's 1/e ellipse.
//!
//! Parameters `[x0, y0, z0, R]`; the residual of a sample is its distance
//! from the centre minus `R`.

use fdms_core::{finite_std_dev, AnalysisError, Map2, PixelGrid, Real, SphereCap, TiltedGaussian};
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::covariance::normal_matrix_inverse;
use crate::problems::collect_points;
use crate::{GaussianFitResult, LmBackend, NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

const PROBLEM: &str = "sphere cap";
const NUM_PARAMS: usize = 4;
/// Pivot ratio below which the normal matrix at the solution counts as singular.
const MIN_PIVOT_RATIO: Real = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereFitResult {
    pub sphere: SphereCap,
    /// Radius of curvature `|R|` (µm).
    pub roc: Real,
    /// Geometric residual inside the mask, `NaN` outside.
    pub residuals: Map2,
    pub residual_std: Real,
    /// Number of samples inside the mask.
    pub num_points: usize,
    pub report: SolveReport,
    /// Gaussian whose ellipse selected the samples.
    pub source: TiltedGaussian,
}

impl SphereFitResult {
    /// Whether this fit still belongs to `gaussian`; a sphere fit is stale
    /// once the Gaussian it was masked with changes.
    pub fn is_derived_from(&self, gaussian: &GaussianFitResult) -> bool {
        self.source == gaussian.model
    }
}

struct SphereCapProblem {
    xs: Vec<Real>,
    ys: Vec<Real>,
    zs: Vec<Real>,
}

impl NllsProblem for SphereCapProblem {
    fn num_params(&self) -> usize {
        NUM_PARAMS
    }

    fn num_residuals(&self) -> usize {
        self.zs.len()
    }

    fn residuals(&self, p: &DVector<Real>) -> DVector<Real> {
        let s = sphere_from(p);
        DVector::from_iterator(
            self.zs.len(),
            self.xs
                .iter()
                .zip(&self.ys)
                .zip(&self.zs)
                .map(|((&x, &y), &z)| s.residual(x, y, z)),
        )
    }

    fn jacobian(&self, p: &DVector<Real>) -> DMatrix<Real> {
        let mut j = DMatrix::zeros(self.zs.len(), NUM_PARAMS);
        for i in 0..self.zs.len() {
            let dx = self.xs[i] - p[0];
            let dy = self.ys[i] - p[1];
            let dz = self.zs[i] - p[2];
            let d = (dx * dx + dy * dy + dz * dz).sqrt();
            if d > 0.0 {
                j[(i, 0)] = -dx / d;
                j[(i, 1)] = -dy / d;
                j[(i, 2)] = -dz / d;
            }
            j[(i, 3)] = -1.0;
        }
        j
    }
}

fn sphere_from(p: &DVector<Real>) -> SphereCap {
    SphereCap {
        x0: p[0],
        y0: p[1],
        z0: p[2],
        radius: p[3],
    }
}

/// Fit a sphere inside the 1/e ellipse of a Gaussian fit, seeded with the
/// mean Gaussian radius of curvature.
pub fn fit_sphere_cap(
    height: &Map2,
    grid: &PixelGrid,
    gaussian: &GaussianFitResult,
    opts: &SolveOptions,
) -> Result<SphereFitResult, AnalysisError> {
    fit_sphere_in_ellipse(height, grid, &gaussian.model, gaussian.roc_mean(), opts)
}

/// Fit a sphere to the samples with `((x−x0)/σx)² + ((y−y0)/σy)² < 1`.
///
/// The seed centre sits at the Gaussian centre, `roc_seed` away from the
/// dimple apex on the concave side. Fewer than four samples in the mask is a
/// data error; solver failure or a singular normal matrix at the solution is
/// a fit-convergence error.
pub fn fit_sphere_in_ellipse(
    height: &Map2,
    grid: &PixelGrid,
    mask: &TiltedGaussian,
    roc_seed: Real,
    opts: &SolveOptions,
) -> Result<SphereFitResult, AnalysisError> {
    AnalysisError::check_positive("sphere radius seed", roc_seed)?;
    let (xs, ys, zs) = collect_points(height, grid, "height map", |x, y| {
        mask.inside_unit_ellipse(x, y)
    })?;
    if zs.len() < NUM_PARAMS {
        return Err(AnalysisError::TooFewPoints {
            what: "sphere mask",
            required: NUM_PARAMS,
            available: zs.len(),
        });
    }
    let num_points = zs.len();

    let apex = mask.eval(mask.x0, mask.y0);
    let z0 = apex - mask.amplitude.signum() * roc_seed;
    let x0 = DVector::from_vec(vec![mask.x0, mask.y0, z0, roc_seed]);

    let problem = SphereCapProblem { xs, ys, zs };
    let (p, report) = LmBackend.solve(&problem, x0, opts);
    if !report.converged || p.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::FitDidNotConverge {
            problem: PROBLEM,
            reason: report.termination,
        });
    }
    // samples in one plane through the centre leave the sphere undetermined
    normal_matrix_inverse(&problem, &p, PROBLEM, MIN_PIVOT_RATIO)?;

    let sphere = sphere_from(&p);
    let residuals = Map2::from_fn(grid.rows, grid.cols, |r, c| {
        let (x, y) = (grid.x_um(c), grid.y_um(r));
        if mask.inside_unit_ellipse(x, y) {
            sphere.residual(x, y, height[(r, c)])
        } else {
            Real::NAN
        }
    });
    let residual_std = finite_std_dev(&residuals);
    let roc = sphere.radius.abs();
    info!("{PROBLEM} fit over {num_points} points: roc {roc:.3} um, residual std {residual_std:.2e} um");

    Ok(SphereFitResult {
        sphere,
        roc,
        residuals,
        residual_std,
        num_points,
        report,
        source: *mask,
    })
}
