//! Finite-difference phase-stepping formulas.
//!
//! With `I_k` the averaged frame of step `k`:
//!
//! | steps | numerator              | denominator              |
//! |-------|------------------------|--------------------------|
//! | 5     | `−2I₁ + 2I₃`           | `I₀ − 2I₂ + I₄`          |
//! | 6     | `−3I₁ + 4I₃ − I₅`      | `I₀ − 4I₂ + 3I₄`         |
//! | 7     | `4(I₁ − 2I₃ + I₅)`     | `−I₀ + 7I₂ − 7I₄ + I₆`   |
//!
//! and `φ = atan2(num, den)`. Contrast always uses the first five frames:
//! `2√(4(I₁ − I₃)² + (I₀ − 2I₂ + I₄)²) / (I₀ + 2(I₁ + I₂ + I₃) + I₄)`.

use fdms_core::{AnalysisError, Map2, PhaseStepCount, Real};

use crate::AveragedFrameSet;

/// Full-frame demodulation output.
#[derive(Debug, Clone, PartialEq)]
pub struct Demodulated {
    /// Wrapped phase in `(−π, π]`.
    pub phase: Map2,
    /// Fringe contrast clipped to `[0, 1]`.
    pub contrast: Map2,
}

/// Demodulate the first `steps` averaged frames.
pub fn demodulate(
    frames: &AveragedFrameSet,
    steps: PhaseStepCount,
) -> Result<Demodulated, AnalysisError> {
    let i = frames.frames();
    let required = steps.count();
    if i.len() < required {
        return Err(AnalysisError::NotEnoughFrames {
            formula: required,
            required,
            available: i.len(),
        });
    }

    let (nom, denom) = match steps {
        PhaseStepCount::Five => (
            -2.0 * &i[1] + 2.0 * &i[3],
            &i[0] - 2.0 * &i[2] + &i[4],
        ),
        PhaseStepCount::Six => (
            -3.0 * &i[1] + 4.0 * &i[3] - &i[5],
            &i[0] - 4.0 * &i[2] + 3.0 * &i[4],
        ),
        PhaseStepCount::Seven => (
            4.0 * (&i[1] - 2.0 * &i[3] + &i[5]),
            -&i[0] + 7.0 * &i[2] - 7.0 * &i[4] + &i[6],
        ),
    };

    Ok(Demodulated {
        phase: nom.zip_map(&denom, Real::atan2),
        contrast: raw_contrast(i).map(clip_contrast),
    })
}

/// Unclipped contrast from the first five frames; the caller guarantees at
/// least five are present.
pub fn raw_contrast(i: &[Map2]) -> Map2 {
    let diff = &i[1] - &i[3];
    let second = &i[0] - 2.0 * &i[2] + &i[4];
    let nom = diff.zip_map(&second, |d, s| 2.0 * (4.0 * d * d + s * s).sqrt());
    let denom = &i[0] + 2.0 * (&i[1] + &i[2] + &i[3]) + &i[4];
    nom.component_div(&denom)
}

fn clip_contrast(c: Real) -> Real {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdms_core::synthetic::InterferogramSynth;
    use fdms_core::ErrorKind;
    use std::f64::consts::PI;

    fn phase_ramp() -> Map2 {
        // covers the whole (−π, π) circle plus a few wrapped values
        Map2::from_fn(6, 7, |r, c| -3.0 + 0.9 * r as Real + 0.35 * c as Real)
    }

    fn check_recovery(steps: PhaseStepCount) {
        let truth = phase_ramp();
        let frames = InterferogramSynth::new(steps)
            .with_fringes(500.0, 300.0)
            .frames(&truth);
        let set = AveragedFrameSet::from_frames(frames).unwrap();
        let out = demodulate(&set, steps).unwrap();
        for (got, want) in out.phase.iter().zip(truth.iter()) {
            let d = (got - want).rem_euclid(2.0 * PI);
            let d = d.min(2.0 * PI - d);
            assert!(d < 1e-9, "{steps:?}: got {got}, want {want}");
        }
        for c in out.contrast.iter() {
            assert!((c - 0.6).abs() < 1e-9, "{steps:?}: contrast {c}");
        }
    }

    #[test]
    fn five_step_recovers_phase() {
        check_recovery(PhaseStepCount::Five);
    }

    #[test]
    fn six_step_recovers_phase() {
        check_recovery(PhaseStepCount::Six);
    }

    #[test]
    fn seven_step_recovers_phase() {
        check_recovery(PhaseStepCount::Seven);
    }

    #[test]
    fn contrast_is_clipped_to_unit_interval() {
        let frames = vec![
            Map2::from_element(1, 2, 1.0),
            Map2::from_row_slice(1, 2, &[-5.0, 0.0]),
            Map2::from_element(1, 2, 0.0),
            Map2::from_row_slice(1, 2, &[5.0, 0.0]),
            Map2::from_element(1, 2, -1.0),
        ];
        let set = AveragedFrameSet::from_frames(frames).unwrap();
        let out = demodulate(&set, PhaseStepCount::Five).unwrap();
        assert!(out.contrast.iter().all(|c| (0.0..=1.0).contains(c)));
        // 0/0 in the second column
        assert_eq!(out.contrast[(0, 1)], 0.0);
    }

    #[test]
    fn too_few_frames_is_a_configuration_error() {
        let set = AveragedFrameSet::from_frames(vec![Map2::zeros(2, 2); 5]).unwrap();
        let err = demodulate(&set, PhaseStepCount::Seven).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(
            err,
            AnalysisError::NotEnoughFrames { required: 7, available: 5, .. }
        ));
    }
}
