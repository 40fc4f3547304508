//! Piezo phase-step check: does one step really shift the phase by π/2?

use fdms_core::{mean, AnalysisError, InterferogramStack, Map2, Real, Roi};
use fdms_optim::{fit_step_cosine, SolveOptions, StepCosineFit};
use fdms_phase::{average_frames, crop, demodulate, AveragedFrameSet, PhaseUnwrapper};
use serde::{Deserialize, Serialize};

use crate::helpers::resolve_step_count;
use crate::AnalysisConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCalibration {
    /// Mean intensity inside the ROI for each step.
    pub intensities: Vec<Real>,
    /// Mean phase inside the ROI used as the phase seed.
    pub phase_seed: Real,
    pub fit: StepCosineFit,
}

/// Fit the step cosine to the ROI means of every averaged frame.
///
/// `phase` is a full-frame phase map (ideally unwrapped) whose ROI mean
/// seeds the fitted phase.
pub fn calibrate_phase_steps(
    frames: &AveragedFrameSet,
    phase: &Map2,
    roi: &Roi,
    opts: &SolveOptions,
) -> Result<StepCalibration, AnalysisError> {
    let intensities = frames
        .frames()
        .iter()
        .map(|f| crop(f, roi).map(|patch| patch.mean()))
        .collect::<Result<Vec<_>, _>>()?;
    let phase_seed = mean(crop(phase, roi)?.iter().copied());
    let fit = fit_step_cosine(&intensities, phase_seed, opts)?;
    Ok(StepCalibration {
        intensities,
        phase_seed,
        fit,
    })
}

/// Average, demodulate and unwrap `stack`, then run [`calibrate_phase_steps`]
/// over the steps selected by `config.use_steps`.
pub fn calibrate_stack_steps<U: PhaseUnwrapper + ?Sized>(
    stack: &InterferogramStack,
    roi: &Roi,
    config: &AnalysisConfig,
    unwrapper: &U,
) -> Result<StepCalibration, AnalysisError> {
    let (rows, cols) = stack.frame_shape();
    roi.validate(rows, cols)?;
    let steps = resolve_step_count(stack.step_count(), config.use_steps)?;
    let averaged = average_frames(stack, config.averaging)?;
    let demod = demodulate(&averaged, steps)?;
    let unwrapped = unwrapper.unwrap(&demod.phase)?;
    let used = AveragedFrameSet::from_frames(averaged.frames()[..steps.count()].to_vec())?;
    calibrate_phase_steps(&used, &unwrapped, roi, &config.step_fit)
}
