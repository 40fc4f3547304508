//! End-to-end fibre-dimple analysis.
//!
//! [`run_analysis`] takes a recorded [`InterferogramStack`] and an
//! [`AnalysisConfig`] and returns an [`AnalysisOutput`] holding every
//! intermediate map and both surface fits. Reporting is kept separate:
//! [`report`] turns an output into the fixed-column record and the summary
//! text, [`export`] into the height-map export, and [`report::FileReporter`]
//! writes them to disk.
//!
//! [`core_locator`] and [`step_calibration`] are the two auxiliary
//! workflows used while setting up a measurement.

pub mod config;
pub mod core_locator;
pub mod error;
pub mod export;
pub mod helpers;
pub mod report;
pub mod step_calibration;

pub use config::{AnalysisConfig, ReportOptions};
pub use core_locator::{locate_core, CoreLocation, CoreLocatorOptions};
pub use error::PipelineError;
pub use export::HeightExport;
pub use report::{AnalysisRecord, AnalysisSummary, FileReporter};
pub use step_calibration::{calibrate_phase_steps, calibrate_stack_steps, StepCalibration};

use fdms_core::{
    AnalysisError, InterferogramStack, Map2, PhaseStepCount, PixelGrid, Real, Roi,
};
use fdms_optim::{GaussianFitResult, SphereFitResult};
use fdms_phase::{InitialGuess, PhaseUnwrapper, QualityGuidedUnwrapper};
use log::info;

use crate::helpers::{demodulate_stack, fit_dimple, height_in_roi, resolve_step_count};

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    /// Source filename recorded with the stack.
    pub filename: String,
    pub steps: PhaseStepCount,
    /// Validated ROI the maps below were cropped to.
    pub roi: Roi,
    pub grid: PixelGrid,
    pub wavelength_m: Real,
    /// Full-frame wrapped phase.
    pub wrapped_phase: Map2,
    /// Full-frame contrast in `[0, 1]`.
    pub contrast: Map2,
    pub unwrapped_phase: Map2,
    /// Corner-zeroed height in the ROI (µm).
    pub height: Map2,
    pub initial_guess: InitialGuess,
    pub gaussian: GaussianFitResult,
    pub sphere: SphereFitResult,
}

/// Run the full analysis with the default unwrapper.
pub fn run_analysis(
    stack: &InterferogramStack,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, AnalysisError> {
    run_analysis_with(stack, config, &QualityGuidedUnwrapper)
}

/// Run the full analysis with a caller-supplied unwrapper.
///
/// Step count and ROI are checked before any frame is touched; a failure
/// aborts this run only.
pub fn run_analysis_with<U: PhaseUnwrapper + ?Sized>(
    stack: &InterferogramStack,
    config: &AnalysisConfig,
    unwrapper: &U,
) -> Result<AnalysisOutput, AnalysisError> {
    let steps = resolve_step_count(stack.step_count(), config.use_steps)?;
    let (rows, cols) = stack.frame_shape();
    let roi = config.roi.unwrap_or_else(|| Roi::full(rows, cols));
    roi.validate(rows, cols)?;
    AnalysisError::check_positive("pixel_scale_um", config.pixel_scale_um)?;
    let wavelength_m = config.wavelength_m.unwrap_or_else(|| stack.wavelength_m());
    AnalysisError::check_positive("wavelength_m", wavelength_m)?;

    info!(
        "analysing '{}': {} of {} steps, roi {}, {} exposures per step",
        stack.filename(),
        steps.count(),
        stack.step_count(),
        roi,
        stack.images_per_step()
    );

    let demod = demodulate_stack(stack, steps, config.averaging)?;
    let region = height_in_roi(
        &demod.phase,
        &roi,
        unwrapper,
        wavelength_m,
        config.height_sign,
    )?;
    let grid = PixelGrid::for_roi(&region.bounds, config.pixel_scale_um)?;
    let fits = fit_dimple(&region.height, &grid, config)?;

    Ok(AnalysisOutput {
        filename: stack.filename().to_string(),
        steps,
        roi,
        grid,
        wavelength_m,
        wrapped_phase: demod.phase,
        contrast: demod.contrast,
        unwrapped_phase: region.unwrapped,
        height: region.height,
        initial_guess: fits.initial_guess,
        gaussian: fits.gaussian,
        sphere: fits.sphere,
    })
}
