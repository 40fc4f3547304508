//! Non-linear least-squares fits for fibre-dimple analysis.
//!
//! Problems implement the dense [`NllsProblem`] trait with analytic
//! Jacobians and are solved through an [`NllsSolverBackend`]; the default
//! backend wraps the `levenberg-marquardt` crate.
//!
//! Provided problems:
//! - [`problems::gaussian_tilt`]: tilted elliptical Gaussian on a plane,
//! - [`problems::sphere_cap`]: sphere through the points inside the Gaussian's 1/e ellipse,
//! - [`problems::step_cosine`]: cosine through per-step mean intensities,
//! - [`problems::core_gaussian`]: axis-aligned Gaussian spot in pixel units.

pub mod backend_lm;
pub mod covariance;
pub mod problems;
pub mod traits;

pub use backend_lm::LmBackend;
pub use covariance::{covariance_at, normal_matrix_inverse};
pub use problems::core_gaussian::{fit_core_gaussian, AxisGaussian, CoreGaussianFit};
pub use problems::gaussian_tilt::{
    fit_tilted_gaussian, GaussianFitOptions, GaussianFitResult, ThetaConvention,
};
pub use problems::sphere_cap::{fit_sphere_cap, fit_sphere_in_ellipse, SphereFitResult};
pub use problems::step_cosine::{fit_step_cosine, StepCosineFit};
pub use traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
