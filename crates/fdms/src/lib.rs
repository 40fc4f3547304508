//! High-level entry crate for fibre-dimple interferometry.
//!
//! A phase-stepped interferogram stack goes through averaging, demodulation,
//! ROI selection, unwrapping and height conversion, then a tilted Gaussian
//! and a sphere cap are fitted to the dimple.
//!
//! ## One call
//!
//! ```no_run
//! use fdms::pipeline::{run_analysis, AnalysisConfig, FileReporter, ReportOptions};
//! use fdms::core::{InterferogramStack, Roi};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stack: InterferogramStack = serde_json::from_str(&std::fs::read_to_string("stack.json")?)?;
//! let config = AnalysisConfig {
//!     roi: Some(Roi::new(310, 380, 300, 380)),
//!     ..Default::default()
//! };
//! let output = run_analysis(&stack, &config)?;
//! println!("depth {:.4} um, RoC {:.2} um", output.gaussian.depth(), output.sphere.roc);
//!
//! FileReporter::new("reports", ReportOptions::default()).report_now(&output)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Stage by stage
//!
//! ```no_run
//! use fdms::core::{AveragingWindow, HeightSign, InterferogramStack, PixelGrid, Roi};
//! use fdms::optim::{fit_sphere_cap, fit_tilted_gaussian, GaussianFitOptions, SolveOptions};
//! use fdms::phase::{
//!     average_frames, demodulate, estimate_initial_guess, height_map, select_region,
//!     PhaseUnwrapper, QualityGuidedUnwrapper,
//! };
//!
//! # fn run(stack: &InterferogramStack) -> Result<(), Box<dyn std::error::Error>> {
//! let steps = stack.step_count().try_into()?;
//! let averaged = average_frames(stack, AveragingWindow::All)?;
//! let demod = demodulate(&averaged, steps)?;
//! let (wrapped, bounds) = select_region(&demod.phase, &Roi::new(310, 380, 300, 380))?;
//! let unwrapped = QualityGuidedUnwrapper.unwrap(&wrapped)?;
//! let height = height_map(&unwrapped, stack.wavelength_m(), HeightSign::Positive)?;
//!
//! let grid = PixelGrid::for_roi(&bounds, 0.1172)?;
//! let seed = estimate_initial_guess(&height, &grid);
//! let gaussian = fit_tilted_gaussian(&height, &grid, &seed.model, &GaussianFitOptions::default())?;
//! let sphere = fit_sphere_cap(&height, &grid, &gaussian, &SolveOptions::default())?;
//! println!("RoC x {:.2} um, sphere {:.2} um", gaussian.roc_x(), sphere.roc);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - **[`core`]**: grids, stacks, policies, surface models, errors, synthetic data
//! - **[`phase`]**: averaging, demodulation, unwrapping, height conversion, seeding
//! - **[`optim`]**: non-linear least-squares problems and the LM backend
//! - **[`pipeline`]**: end-to-end analysis, reporting, core location, step check

/// Core types: pixel grid, interferogram stack, ROI, policies, surface models.
pub mod core {
    pub use fdms_core::*;
}

/// Phase retrieval from averaged interferograms down to a height map.
pub mod phase {
    pub use fdms_phase::*;
}

/// Non-linear least-squares surface fits.
pub mod optim {
    pub use fdms_optim::*;
}

/// End-to-end analysis and reporting.
pub mod pipeline {
    pub use fdms_pipeline::*;
}

/// Convenient re-exports for common use cases.
pub mod prelude {
    pub use fdms_core::{
        AnalysisError, AveragingWindow, ErrorKind, HeightSign, InterferogramStack, Map2,
        PhaseStepCount, PixelGrid, Real, Roi, SphereCap, TiltedGaussian,
    };
    pub use fdms_optim::{GaussianFitResult, SolveOptions, SphereFitResult};
    pub use fdms_phase::{PhaseUnwrapper, QualityGuidedUnwrapper};
    pub use fdms_pipeline::{
        run_analysis, AnalysisConfig, AnalysisOutput, FileReporter, ReportOptions,
    };
}
