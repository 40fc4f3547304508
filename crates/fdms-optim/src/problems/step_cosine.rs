//! Cosine through per-step mean intensities.
//!
//! `y_k = A·cos(x_k / p − φ) + c` with `x_k = k·π/2`. A fitted period
//! `p ≈ 1` means every piezo step shifted the phase by a quarter wave.

use std::f64::consts::FRAC_PI_2;

use fdms_core::{AnalysisError, Real};
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{LmBackend, NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

const PROBLEM: &str = "step cosine";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCosineFit {
    pub amplitude: Real,
    /// Period in units of the nominal quarter-wave step.
    pub period: Real,
    pub phase: Real,
    pub offset: Real,
    pub report: SolveReport,
}

impl StepCosineFit {
    pub fn eval(&self, x: Real) -> Real {
        self.amplitude * (x / self.period - self.phase).cos() + self.offset
    }
}

struct StepCosineProblem {
    ys: Vec<Real>,
}

fn step_position(k: usize) -> Real {
    k as Real * FRAC_PI_2
}

impl NllsProblem for StepCosineProblem {
    fn num_params(&self) -> usize {
        4
    }

    fn num_residuals(&self) -> usize {
        self.ys.len()
    }

    fn residuals(&self, p: &DVector<Real>) -> DVector<Real> {
        DVector::from_iterator(
            self.ys.len(),
            self.ys.iter().enumerate().map(|(k, y)| {
                p[0] * (step_position(k) / p[1] - p[2]).cos() + p[3] - y
            }),
        )
    }

    fn jacobian(&self, p: &DVector<Real>) -> DMatrix<Real> {
        let mut j = DMatrix::zeros(self.ys.len(), 4);
        for k in 0..self.ys.len() {
            let x = step_position(k);
            let (s, c) = (x / p[1] - p[2]).sin_cos();
            j[(k, 0)] = c;
            j[(k, 1)] = p[0] * s * x / (p[1] * p[1]);
            j[(k, 2)] = p[0] * s;
            j[(k, 3)] = 1.0;
        }
        j
    }
}

/// Fit the step cosine to `intensities[k]`, seeding the phase with
/// `phase_seed` (typically the mean unwrapped phase over the same ROI).
pub fn fit_step_cosine(
    intensities: &[Real],
    phase_seed: Real,
    opts: &SolveOptions,
) -> Result<StepCosineFit, AnalysisError> {
    if intensities.len() < 4 {
        return Err(AnalysisError::TooFewPoints {
            what: PROBLEM,
            required: 4,
            available: intensities.len(),
        });
    }
    if let Some(k) = intensities.iter().position(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite {
            what: "step intensities",
            row: k,
            col: 0,
        });
    }

    let max = intensities.iter().copied().fold(Real::NEG_INFINITY, Real::max);
    let min = intensities.iter().copied().fold(Real::INFINITY, Real::min);
    let amplitude = 0.5 * (max - min);
    let seed = DVector::from_vec(vec![amplitude, 1.0, phase_seed, max - amplitude]);

    let problem = StepCosineProblem {
        ys: intensities.to_vec(),
    };
    let (p, report) = LmBackend.solve(&problem, seed, opts);
    if !report.converged || p.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::FitDidNotConverge {
            problem: PROBLEM,
            reason: report.termination,
        });
    }
    info!(
        "{PROBLEM} fit: amplitude {:.3}, period {:.4}, phase {:.4} rad, offset {:.3}",
        p[0], p[1], p[2], p[3]
    );

    Ok(StepCosineFit {
        amplitude: p[0],
        period: p[1],
        phase: p[2],
        offset: p[3],
        report,
    })
}
