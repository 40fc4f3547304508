use fdms_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Generic non-linear least squares problem with dense parameter/residual vectors.
pub trait NllsProblem {
    /// Number of parameters in the optimization vector.
    fn num_params(&self) -> usize;
    /// Number of residual rows in the problem.
    fn num_residuals(&self) -> usize;

    /// Residuals for the current parameters.
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;
    /// Jacobian of [`NllsProblem::residuals`], `num_residuals × num_params`.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Maximum number of solver iterations before termination.
    ///
    /// The LM backend follows the MINPACK convention and caps function
    /// evaluations at `max_iters * (n + 1)`.
    pub max_iters: usize,
    /// Relative tolerance on the objective (cost) reduction.
    pub ftol: Real,
    /// Orthogonality/gradient tolerance.
    pub gtol: Real,
    /// Relative tolerance on parameter updates.
    pub xtol: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-12,
            gtol: 1e-12,
            xtol: 1e-12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    /// Residual evaluations spent.
    pub iterations: usize,
    /// `½‖r‖²` at the returned parameters.
    pub final_cost: Real,
    pub converged: bool,
    /// Backend-specific termination reason.
    pub termination: String,
}

pub trait NllsSolverBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport);
}
