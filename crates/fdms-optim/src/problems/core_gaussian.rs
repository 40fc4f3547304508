//! Axis-aligned Gaussian spot in pixel units, used to locate the fibre core
//! in a single intensity image.

use fdms_core::{AnalysisError, Map2, Real};
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{LmBackend, NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

const PROBLEM: &str = "core Gaussian";

/// `offset + amplitude·exp(−((x−x0)²/(2σx²) + (y−y0)²/(2σy²)))`, with `x`
/// the column and `y` the row index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisGaussian {
    pub amplitude: Real,
    pub x0: Real,
    pub y0: Real,
    pub sigma_x: Real,
    pub sigma_y: Real,
    pub offset: Real,
}

impl AxisGaussian {
    pub fn eval(&self, x: Real, y: Real) -> Real {
        let u = (x - self.x0) / self.sigma_x;
        let v = (y - self.y0) / self.sigma_y;
        self.offset + self.amplitude * (-0.5 * (u * u + v * v)).exp()
    }

    fn params(&self) -> DVector<Real> {
        DVector::from_vec(vec![
            self.amplitude,
            self.x0,
            self.y0,
            self.sigma_x,
            self.sigma_y,
            self.offset,
        ])
    }

    fn from_params(p: &DVector<Real>) -> Self {
        Self {
            amplitude: p[0],
            x0: p[1],
            y0: p[2],
            sigma_x: p[3].abs(),
            sigma_y: p[4].abs(),
            offset: p[5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreGaussianFit {
    /// Fitted spot in the coordinates of the fitted window.
    pub spot: AxisGaussian,
    pub report: SolveReport,
}

struct CoreGaussianProblem<'a> {
    image: &'a Map2,
}

impl NllsProblem for CoreGaussianProblem<'_> {
    fn num_params(&self) -> usize {
        6
    }

    fn num_residuals(&self) -> usize {
        self.image.len()
    }

    fn residuals(&self, p: &DVector<Real>) -> DVector<Real> {
        let g = AxisGaussian::from_params(p);
        let rows = self.image.nrows();
        // column-major storage
        DVector::from_iterator(
            self.image.len(),
            self.image.iter().enumerate().map(|(i, z)| {
                g.eval((i / rows) as Real, (i % rows) as Real) - z
            }),
        )
    }

    fn jacobian(&self, p: &DVector<Real>) -> DMatrix<Real> {
        let (a, x0, y0, sx, sy) = (p[0], p[1], p[2], p[3], p[4]);
        let rows = self.image.nrows();
        let mut j = DMatrix::zeros(self.image.len(), 6);
        for i in 0..self.image.len() {
            let dx = (i / rows) as Real - x0;
            let dy = (i % rows) as Real - y0;
            let e = (-0.5 * (dx * dx / (sx * sx) + dy * dy / (sy * sy))).exp();
            j[(i, 0)] = e;
            j[(i, 1)] = a * e * dx / (sx * sx);
            j[(i, 2)] = a * e * dy / (sy * sy);
            j[(i, 3)] = a * e * dx * dx / (sx * sx * sx);
            j[(i, 4)] = a * e * dy * dy / (sy * sy * sy);
            j[(i, 5)] = 1.0;
        }
        j
    }
}

/// Fit an [`AxisGaussian`] to `image` from `seed`.
pub fn fit_core_gaussian(
    image: &Map2,
    seed: &AxisGaussian,
    opts: &SolveOptions,
) -> Result<CoreGaussianFit, AnalysisError> {
    if image.len() <= 6 {
        return Err(AnalysisError::TooFewPoints {
            what: PROBLEM,
            required: 7,
            available: image.len(),
        });
    }
    AnalysisError::check_positive("seed sigma_x", seed.sigma_x)?;
    AnalysisError::check_positive("seed sigma_y", seed.sigma_y)?;

    let problem = CoreGaussianProblem { image };
    let (p, report) = LmBackend.solve(&problem, seed.params(), opts);
    if !report.converged || p.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::FitDidNotConverge {
            problem: PROBLEM,
            reason: report.termination,
        });
    }
    let spot = AxisGaussian::from_params(&p);
    info!(
        "{PROBLEM} fit: centre ({:.2}, {:.2}) px, sigma ({:.2}, {:.2}) px",
        spot.x0, spot.y0, spot.sigma_x, spot.sigma_y
    );
    Ok(CoreGaussianFit { spot, report })
}
