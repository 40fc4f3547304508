use fdms_core::{AnalysisError, AveragingWindow, InterferogramStack, Map2, Real};
use log::debug;

/// One mean frame per phase step.
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedFrameSet {
    frames: Vec<Map2>,
}

impl AveragedFrameSet {
    /// Wrap already-averaged frames (all of the same shape).
    pub fn from_frames(frames: Vec<Map2>) -> Result<Self, AnalysisError> {
        let Some(first) = frames.first() else {
            return Err(AnalysisError::EmptyStack);
        };
        let shape = first.shape();
        if let Some((step, f)) = frames.iter().enumerate().find(|(_, f)| f.shape() != shape) {
            return Err(AnalysisError::InconsistentStack {
                step,
                detail: format!("frame is {}x{}, expected {}x{}", f.nrows(), f.ncols(), shape.0, shape.1),
            });
        }
        Ok(Self { frames })
    }

    pub fn step_count(&self) -> usize {
        self.frames.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.frames[0].shape()
    }

    pub fn frames(&self) -> &[Map2] {
        &self.frames
    }

    pub fn frame(&self, step: usize) -> &Map2 {
        &self.frames[step]
    }
}

/// Mean over the exposures selected by `window`, per step.
///
/// Fails with a data error when the stack holds no exposures or the window
/// is empty, and with a configuration error when the window runs past the
/// recorded exposures.
pub fn average_frames(
    stack: &InterferogramStack,
    window: AveragingWindow,
) -> Result<AveragedFrameSet, AnalysisError> {
    let range = window.resolve(stack.images_per_step())?;
    let (rows, cols) = stack.frame_shape();
    let n = range.len() as Real;
    debug!(
        "averaging exposures {:?} of {} over {} steps",
        range,
        stack.images_per_step(),
        stack.step_count()
    );

    let frames = (0..stack.step_count())
        .map(|step| {
            let mut acc = Map2::zeros(rows, cols);
            for frame in &stack.step_frames(step)[range.clone()] {
                acc += frame;
            }
            acc / n
        })
        .collect();

    Ok(AveragedFrameSet { frames })
}
