use fdms_core::{AnalysisError, Real};
use nalgebra::{DMatrix, DVector};

use crate::NllsProblem;

/// `(JᵀJ)⁻¹` at `x`.
///
/// Fails with [`AnalysisError::SingularJacobian`] when `JᵀJ` is not
/// positive definite, or when its smallest Cholesky pivot is not above
/// `min_pivot_ratio` times the largest one.
pub fn normal_matrix_inverse<P: NllsProblem>(
    problem: &P,
    x: &DVector<Real>,
    name: &'static str,
    min_pivot_ratio: Real,
) -> Result<DMatrix<Real>, AnalysisError> {
    let singular = AnalysisError::SingularJacobian { problem: name };
    let j = problem.jacobian(x);
    let chol = j.tr_mul(&j).cholesky().ok_or_else(|| singular.clone())?;

    let pivots = chol.l_dirty().diagonal();
    if pivots.iter().any(|v| !v.is_finite()) || pivots.min() <= pivots.max() * min_pivot_ratio {
        return Err(singular);
    }
    let inv = chol.inverse();
    if inv.iter().all(|v| v.is_finite()) {
        Ok(inv)
    } else {
        Err(singular)
    }
}

/// Parameter covariance `(JᵀJ)⁻¹ · ‖r‖² / (m − n)` at `x`.
///
/// Fails with [`AnalysisError::SingularJacobian`] when `JᵀJ` is not positive
/// definite and with [`AnalysisError::TooFewPoints`]
/// when there are no degrees of freedom left.
pub fn covariance_at<P: NllsProblem>(
    problem: &P,
    x: &DVector<Real>,
    name: &'static str,
) -> Result<DMatrix<Real>, AnalysisError> {
    let m = problem.num_residuals();
    let n = problem.num_params();
    if m <= n {
        return Err(AnalysisError::TooFewPoints {
            what: name,
            required: n + 1,
            available: m,
        });
    }
    let r = problem.residuals(x);
    Ok(normal_matrix_inverse(problem, x, name, 0.0)? * (r.norm_squared() / (m - n) as Real))
}

/// Square roots of the covariance diagonal.
pub fn std_errors(cov: &DMatrix<Real>) -> DVector<Real> {
    cov.diagonal().map(|v| v.max(0.0).sqrt())
}

/// Swap parameters `a` and `b` in a covariance matrix.
pub(crate) fn swap_params(cov: &mut DMatrix<Real>, a: usize, b: usize) {
    cov.swap_rows(a, b);
    cov.swap_columns(a, b);
}

/// Covariance of `(s₀x₀, s₁x₁, …)` given the covariance of `x`, with `sᵢ = ±1`.
pub(crate) fn flip_signs(cov: &mut DMatrix<Real>, signs: &[Real]) {
    let n = cov.nrows();
    for i in 0..n {
        for j in 0..n {
            cov[(i, j)] *= signs[i] * signs[j];
        }
    }
}
