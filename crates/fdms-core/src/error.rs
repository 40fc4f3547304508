use thiserror::Error;

use crate::{Real, Roi};

/// Broad error class, used by callers to decide whether to fix input,
/// re-seed a fit, or retry acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unsupported step count, invalid ROI, invalid parameters.
    Configuration,
    /// Degenerate estimator input, empty fit mask, zero-length averaging window.
    Data,
    /// Solver failure or ill-conditioned Jacobian.
    FitConvergence,
    /// Surfaced from storage collaborators; never raised by the analysis stages.
    Io,
}

/// How an ROI fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiViolation {
    NegativeOrigin,
    Empty,
    ExceedsHeight,
    ExceedsWidth,
}

impl RoiViolation {
    fn describe(self) -> &'static str {
        match self {
            RoiViolation::NegativeOrigin => "negative position is illegal",
            RoiViolation::Empty => "height and width must be positive",
            RoiViolation::ExceedsHeight => "vertical offset + height exceeds image height",
            RoiViolation::ExceedsWidth => "horizontal offset + width exceeds image width",
        }
    }
}

/// Errors raised by the analysis stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("unsupported number of phase steps {steps} (supported: 5, 6, 7)")]
    UnsupportedStepCount { steps: usize },
    #[error("{formula}-step demodulation needs {required} averaged frames, got {available}")]
    NotEnoughFrames {
        formula: usize,
        required: usize,
        available: usize,
    },
    #[error("invalid ROI {roi:?} for a {rows}x{cols} frame: {}", .violation.describe())]
    InvalidRoi {
        roi: Roi,
        rows: usize,
        cols: usize,
        violation: RoiViolation,
    },
    #[error("invalid parameter `{name}` = {value}")]
    InvalidParameter { name: &'static str, value: Real },
    #[error("averaging window {start}..{} exceeds {images} exposures per step", .start + .len)]
    AveragingWindowOutOfRange {
        start: usize,
        len: usize,
        images: usize,
    },
    #[error("interferogram stack has no phase steps")]
    EmptyStack,
    #[error("inconsistent interferogram stack at step {step}: {detail}")]
    InconsistentStack { step: usize, detail: String },
    #[error("zero-length averaging window (start {start}, len {len}, {images} exposures per step)")]
    EmptyAveragingWindow {
        start: usize,
        len: usize,
        images: usize,
    },
    #[error("{what} is empty")]
    EmptyMap { what: &'static str },
    #[error("{what} contains a non-finite value at ({row}, {col})")]
    NonFinite {
        what: &'static str,
        row: usize,
        col: usize,
    },
    #[error("map shape mismatch: expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("{what}: need at least {required} points, got {available}")]
    TooFewPoints {
        what: &'static str,
        required: usize,
        available: usize,
    },
    #[error("{problem} fit did not converge: {reason}")]
    FitDidNotConverge {
        problem: &'static str,
        reason: String,
    },
    #[error("{problem} fit is ill-conditioned: singular normal matrix at the solution")]
    SingularJacobian { problem: &'static str },
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::UnsupportedStepCount { .. }
            | AnalysisError::NotEnoughFrames { .. }
            | AnalysisError::InvalidRoi { .. }
            | AnalysisError::InvalidParameter { .. }
            | AnalysisError::AveragingWindowOutOfRange { .. } => ErrorKind::Configuration,
            AnalysisError::EmptyStack
            | AnalysisError::InconsistentStack { .. }
            | AnalysisError::EmptyAveragingWindow { .. }
            | AnalysisError::EmptyMap { .. }
            | AnalysisError::NonFinite { .. }
            | AnalysisError::ShapeMismatch { .. }
            | AnalysisError::TooFewPoints { .. } => ErrorKind::Data,
            AnalysisError::FitDidNotConverge { .. } | AnalysisError::SingularJacobian { .. } => {
                ErrorKind::FitConvergence
            }
        }
    }

    /// Reject non-positive or non-finite physical parameters.
    pub fn check_positive(name: &'static str, value: Real) -> Result<Real, AnalysisError> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(AnalysisError::InvalidParameter { name, value })
        }
    }
}
