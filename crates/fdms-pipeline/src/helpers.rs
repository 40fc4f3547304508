//! Individual analysis steps that can be composed into custom workflows.
//!
//! [`crate::run_analysis`] chains these in the fixed order
//! `average → demodulate → crop → unwrap → height → seed → fit`; calling them
//! directly lets a caller inspect or replace an intermediate result (for
//! example re-seeding a Gaussian fit that did not converge).
//!
//! # Example
//!
//! ```ignore
//! use fdms_pipeline::helpers::*;
//!
//! let steps = resolve_step_count(stack.step_count(), Some(5))?;
//! let demod = demodulate_stack(&stack, steps, AveragingWindow::All)?;
//! let region = height_in_roi(&demod.phase, &roi, &QualityGuidedUnwrapper, 635e-9, HeightSign::Positive)?;
//! let grid = PixelGrid::for_roi(&region.bounds, 0.1172)?;
//! let fits = fit_dimple(&region.height, &grid, &config)?;
//! println!("depth {:.3} um", fits.gaussian.depth());
//! ```

use fdms_core::{
    AnalysisError, AveragingWindow, HeightSign, InterferogramStack, Map2, PhaseStepCount,
    PixelGrid, Real, Roi, RoiBounds,
};
use fdms_optim::{fit_sphere_cap, fit_tilted_gaussian, GaussianFitResult, SphereFitResult};
use fdms_phase::{
    average_frames, demodulate, estimate_initial_guess, height_map, select_region, Demodulated,
    InitialGuess, PhaseUnwrapper,
};
use log::{info, warn};

use crate::AnalysisConfig;

/// Pick the demodulation formula for a stack with `stored` steps.
///
/// `requested = None` uses every stored step; a request above `stored` is
/// clamped to `stored`. The resulting count must be 5, 6 or 7.
pub fn resolve_step_count(
    stored: usize,
    requested: Option<usize>,
) -> Result<PhaseStepCount, AnalysisError> {
    let wanted = requested.unwrap_or(stored);
    let used = if wanted > stored {
        warn!("{wanted} phase steps requested but only {stored} recorded; using {stored}");
        stored
    } else {
        wanted
    };
    PhaseStepCount::try_from(used)
}

/// Average the stack and demodulate the full frame.
pub fn demodulate_stack(
    stack: &InterferogramStack,
    steps: PhaseStepCount,
    window: AveragingWindow,
) -> Result<Demodulated, AnalysisError> {
    let averaged = average_frames(stack, window)?;
    demodulate(&averaged, steps)
}

/// Cropped, unwrapped and height-converted region of a wrapped phase map.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightRegion {
    pub bounds: RoiBounds,
    pub unwrapped: Map2,
    /// Corner-zeroed height (µm).
    pub height: Map2,
}

/// Crop the full-frame wrapped phase to `roi`, unwrap it and convert to height.
pub fn height_in_roi<U: PhaseUnwrapper + ?Sized>(
    wrapped: &Map2,
    roi: &Roi,
    unwrapper: &U,
    wavelength_m: Real,
    sign: HeightSign,
) -> Result<HeightRegion, AnalysisError> {
    let (cropped, bounds) = select_region(wrapped, roi)?;
    let unwrapped = unwrapper.unwrap(&cropped)?;
    let height = height_map(&unwrapped, wavelength_m, sign)?;
    Ok(HeightRegion {
        bounds,
        unwrapped,
        height,
    })
}

/// Seed and both surface fits for one height map.
#[derive(Debug, Clone, PartialEq)]
pub struct DimpleFits {
    pub initial_guess: InitialGuess,
    pub gaussian: GaussianFitResult,
    pub sphere: SphereFitResult,
}

/// Estimate the seed, fit the tilted Gaussian, then the sphere cap.
pub fn fit_dimple(
    height: &Map2,
    grid: &PixelGrid,
    config: &AnalysisConfig,
) -> Result<DimpleFits, AnalysisError> {
    let initial_guess = estimate_initial_guess(height, grid);
    let gaussian = fit_tilted_gaussian(height, grid, &initial_guess.model, &config.gaussian)?;
    let sphere = fit_sphere_cap(height, grid, &gaussian, &config.sphere)?;
    info!(
        "dimple: depth {:.4} um, roc ({:.2}, {:.2}) um, sphere roc {:.2} um",
        gaussian.depth(),
        gaussian.roc_x(),
        gaussian.roc_y(),
        sphere.roc
    );
    Ok(DimpleFits {
        initial_guess,
        gaussian,
        sphere,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdms_core::ErrorKind;

    #[test]
    fn step_count_resolution() {
        assert_eq!(resolve_step_count(7, None).unwrap(), PhaseStepCount::Seven);
        assert_eq!(resolve_step_count(7, Some(5)).unwrap(), PhaseStepCount::Five);
        // clamped to what was recorded
        assert_eq!(resolve_step_count(6, Some(7)).unwrap(), PhaseStepCount::Six);

        let err = resolve_step_count(4, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = resolve_step_count(9, Some(8)).unwrap_err();
        assert_eq!(err, AnalysisError::UnsupportedStepCount { steps: 8 });
    }
}
