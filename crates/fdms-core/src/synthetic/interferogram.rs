//! Phase-stepped interferogram synthesis.
//!
//! Frames follow `I_k = mean_level + modulation·cos(φ + (k − k₀)·π/2)` where
//! `k₀` is [`PhaseStepCount::reference_step`], so each demodulation formula
//! recovers `φ` exactly on noise-free data.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::{
    AnalysisError, HeightSign, InterferogramStack, Map2, PhaseStepCount, Real,
    DEFAULT_WAVELENGTH_M,
};

use super::noise::UniformNoise;

/// Parameters of a synthetic phase-stepping acquisition.
#[derive(Debug, Clone, Copy)]
pub struct InterferogramSynth {
    pub steps: PhaseStepCount,
    pub images_per_step: usize,
    /// Background intensity `A`.
    pub mean_level: Real,
    /// Fringe modulation `B`; contrast is `B / A`.
    pub modulation: Real,
    /// Per-exposure additive intensity noise.
    pub noise: UniformNoise,
    pub wavelength_m: Real,
}

impl InterferogramSynth {
    /// Full-contrast fringes with a single exposure per step.
    pub fn new(steps: PhaseStepCount) -> Self {
        Self {
            steps,
            images_per_step: 1,
            mean_level: 1000.0,
            modulation: 1000.0,
            noise: UniformNoise::default(),
            wavelength_m: DEFAULT_WAVELENGTH_M,
        }
    }

    pub fn with_images_per_step(mut self, images: usize) -> Self {
        self.images_per_step = images;
        self
    }

    pub fn with_fringes(mut self, mean_level: Real, modulation: Real) -> Self {
        self.mean_level = mean_level;
        self.modulation = modulation;
        self
    }

    pub fn with_noise(mut self, noise: UniformNoise) -> Self {
        self.noise = noise;
        self
    }

    /// Noise-free intensity frame for step `k`.
    pub fn frame(&self, phase: &Map2, k: usize) -> Map2 {
        let shift = (k as Real - self.steps.reference_step() as Real) * FRAC_PI_2;
        phase.map(|phi| self.mean_level + self.modulation * (phi + shift).cos())
    }

    /// One noise-free frame per step.
    pub fn frames(&self, phase: &Map2) -> Vec<Map2> {
        (0..self.steps.count()).map(|k| self.frame(phase, k)).collect()
    }

    /// Full `[step][image]` stack for a phase map.
    pub fn stack(&self, phase: &Map2) -> Result<InterferogramStack, AnalysisError> {
        let images = self.images_per_step;
        let frames = (0..self.steps.count())
            .map(|k| {
                let clean = self.frame(phase, k);
                (0..images)
                    .map(|i| {
                        let noise = UniformNoise::new(
                            self.noise.seed ^ ((k * images + i) as u64).wrapping_mul(0xA24B_AED4),
                            self.noise.amplitude,
                        );
                        noise.apply(&clean)
                    })
                    .collect()
            })
            .collect();
        Ok(InterferogramStack::new(frames)?.with_wavelength(self.wavelength_m))
    }
}

/// Phase (rad) that a height map (µm) produces under the given sign convention.
///
/// Inverse of `height = sign·φ/(2π)·(λ/2)·1e6`.
pub fn phase_from_height(height_um: &Map2, wavelength_m: Real, sign: HeightSign) -> Map2 {
    let um_per_rad = wavelength_m / 2.0 * 1e6 / (2.0 * PI);
    height_um.map(|h| sign.factor() * h / um_per_rad)
}
