use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::{AnalysisError, Real};

/// Number of phase steps a demodulation formula consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PhaseStepCount {
    Five,
    Six,
    Seven,
}

impl PhaseStepCount {
    /// Number of frames consumed by the formula.
    pub fn count(self) -> usize {
        match self {
            PhaseStepCount::Five => 5,
            PhaseStepCount::Six => 6,
            PhaseStepCount::Seven => 7,
        }
    }

    /// Index of the frame whose piezo offset defines zero phase.
    ///
    /// Frames `I_k = A + B·cos(φ + (k − k₀)·π/2)` demodulate to exactly `φ`.
    pub fn reference_step(self) -> usize {
        match self {
            PhaseStepCount::Five | PhaseStepCount::Six => 0,
            PhaseStepCount::Seven => 2,
        }
    }
}

impl TryFrom<usize> for PhaseStepCount {
    type Error = AnalysisError;

    fn try_from(steps: usize) -> Result<Self, Self::Error> {
        match steps {
            5 => Ok(PhaseStepCount::Five),
            6 => Ok(PhaseStepCount::Six),
            7 => Ok(PhaseStepCount::Seven),
            other => Err(AnalysisError::UnsupportedStepCount { steps: other }),
        }
    }
}

impl From<PhaseStepCount> for usize {
    fn from(steps: PhaseStepCount) -> Self {
        steps.count()
    }
}

/// Sign applied when converting unwrapped phase to height.
///
/// Historical analyses disagree on whether a dimple comes out as a dip or a
/// bump; the choice is explicit configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightSign {
    #[default]
    Positive,
    Negative,
}

impl HeightSign {
    pub fn factor(self) -> Real {
        match self {
            HeightSign::Positive => 1.0,
            HeightSign::Negative => -1.0,
        }
    }
}

/// Which exposures of each phase step enter the per-step mean frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AveragingWindow {
    /// Average every exposure.
    #[default]
    All,
    /// Average exposures `start..start + len`.
    ///
    /// `Range { start: 2, len: 1 }` reproduces the legacy single-exposure analysis.
    Range { start: usize, len: usize },
}

impl AveragingWindow {
    /// The legacy window: only the third exposure of every step.
    pub fn legacy() -> Self {
        AveragingWindow::Range { start: 2, len: 1 }
    }

    /// Resolve the window against `images` exposures per step.
    pub fn resolve(self, images: usize) -> Result<Range<usize>, AnalysisError> {
        let (start, len) = match self {
            AveragingWindow::All => (0, images),
            AveragingWindow::Range { start, len } => (start, len),
        };
        if images == 0 || len == 0 {
            return Err(AnalysisError::EmptyAveragingWindow { start, len, images });
        }
        if start + len > images {
            return Err(AnalysisError::AveragingWindowOutOfRange { start, len, images });
        }
        Ok(start..start + len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn step_count_accepts_only_five_six_seven() {
        for s in [5usize, 6, 7] {
            assert_eq!(PhaseStepCount::try_from(s).unwrap().count(), s);
        }
        for s in [0usize, 3, 4, 8] {
            let err = PhaseStepCount::try_from(s).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert_eq!(err, AnalysisError::UnsupportedStepCount { steps: s });
        }
    }

    #[test]
    fn step_count_serializes_as_integer() {
        let json = serde_json::to_string(&PhaseStepCount::Six).unwrap();
        assert_eq!(json, "6");
        assert!(serde_json::from_str::<PhaseStepCount>("4").is_err());
    }

    #[test]
    fn averaging_window_resolution() {
        assert_eq!(AveragingWindow::All.resolve(4).unwrap(), 0..4);
        assert_eq!(AveragingWindow::legacy().resolve(4).unwrap(), 2..3);

        let err = AveragingWindow::All.resolve(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let err = AveragingWindow::Range { start: 1, len: 0 }.resolve(4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let err = AveragingWindow::legacy().resolve(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn height_sign_factor() {
        assert_eq!(HeightSign::default().factor(), 1.0);
        assert_eq!(HeightSign::Negative.factor(), -1.0);
    }
}
