//! Core types for fibre-dimple interferometric surface analysis.
//!
//! This crate contains:
//! - scalar and map aliases (`Real`, `Map2`) plus small statistics helpers,
//! - the error taxonomy shared by every analysis stage ([`AnalysisError`]),
//! - input descriptions: [`InterferogramStack`], [`Roi`], step counts and the
//!   averaging / sign policies,
//! - the physical coordinate grid used by the fitters ([`PixelGrid`]),
//! - the surface models ([`TiltedGaussian`], [`SphereCap`]) and derived
//!   optical-metrology scalars,
//! - deterministic synthetic data generators for tests and demos.
//!
//! Analysis chain:
//! `stack → averaged frames → wrapped phase → ROI → unwrapped phase → height → fits`

/// Error taxonomy for all analysis stages.
pub mod error;
/// Physical pixel grid and coordinate conversions.
pub mod grid;
/// Scalar aliases and map statistics.
pub mod math;
/// Derived optical-metrology scalars (diameter, ellipticity, radius of curvature).
pub mod metrics;
/// Forward surface models.
pub mod model;
/// Deterministic synthetic interferograms and surfaces.
pub mod synthetic;
/// Input data types and analysis policies.
pub mod types;

pub use error::*;
pub use grid::*;
pub use math::*;
pub use metrics::*;
pub use model::*;
pub use types::*;
