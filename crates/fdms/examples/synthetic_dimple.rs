//! Full dimple analysis on a synthetic interferogram stack.
//!
//! This example:
//! 1. Renders a tilted elliptical Gaussian dimple on a detector-sized grid
//! 2. Synthesises a noisy seven-step stack with three exposures per step
//! 3. Runs the analysis inside an ROI
//! 4. Compares the fitted parameters with the ground truth
//!
//! Run with: `cargo run -p fdms --example synthetic_dimple`

use anyhow::Result;
use fdms::core::synthetic::{gaussian_dimple, phase_from_height, InterferogramSynth, UniformNoise};
use fdms::core::{metrics, DEFAULT_WAVELENGTH_M};
use fdms::pipeline::AnalysisSummary;
use fdms::prelude::*;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("=== Fibre dimple analysis (synthetic) ===\n");

    let scale_um = 0.1172;
    let grid = PixelGrid::new(160, 200, scale_um)?;
    let truth = TiltedGaussian {
        amplitude: -0.8,
        x0: 0.4,
        y0: -0.3,
        sigma_x: 1.6,
        sigma_y: 1.3,
        theta: 0.35,
        offset: 0.0,
        tilt_x: 2e-3,
        tilt_y: -1e-3,
    };

    let height = gaussian_dimple(&grid, &truth, UniformNoise::new(3, 2e-3));
    let phase = phase_from_height(&height, DEFAULT_WAVELENGTH_M, HeightSign::Positive);
    let stack = InterferogramSynth::new(PhaseStepCount::Seven)
        .with_images_per_step(3)
        .with_fringes(800.0, 500.0)
        .with_noise(UniformNoise::new(11, 4.0))
        .stack(&phase)?
        .with_filename("synthetic_dimple.hdf5");

    let config = AnalysisConfig {
        roi: Some(Roi::new(20, 30, 120, 140)),
        pixel_scale_um: scale_um,
        ..Default::default()
    };
    let output = run_analysis(&stack, &config)?;
    println!("{}\n", AnalysisSummary::from_output(&output, "synthetic"));

    let g = &output.gaussian.model;
    println!("parameter      truth      fitted");
    println!("depth     {:>10.4} {:>10.4}", truth.amplitude, g.amplitude);
    println!("sigma_x   {:>10.4} {:>10.4}", truth.sigma_x, g.sigma_x);
    println!("sigma_y   {:>10.4} {:>10.4}", truth.sigma_y, g.sigma_y);
    println!("theta     {:>10.4} {:>10.4}", truth.theta, g.theta);
    println!(
        "RoC x     {:>10.4} {:>10.4}",
        metrics::radius_of_curvature(truth.sigma_x, truth.amplitude),
        output.gaussian.roc_x()
    );
    println!("sphere RoC {:>20.4}", output.sphere.roc);
    Ok(())
}
