//! Integration tests for the full analysis pipeline.
//!
//! This test validates:
//! 1. The flat five-step 10x10 stack reconstructs a zero height map
//! 2. A synthetic dimple is recovered through ROI cropping, unwrapping and both fits
//! 3. Configuration errors abort the run before any frame is processed
//! 4. The file reporter writes the selected artefacts with the expected names

use fdms_core::synthetic::{gaussian_dimple, phase_from_height, InterferogramSynth, UniformNoise};
use fdms_core::{
    AveragingWindow, ErrorKind, HeightSign, InterferogramStack, Map2, PhaseStepCount, PixelGrid,
    Roi, TiltedGaussian, DEFAULT_WAVELENGTH_M,
};
use fdms_phase::QualityGuidedUnwrapper;
use fdms_pipeline::helpers::{demodulate_stack, height_in_roi};
use fdms_pipeline::{
    run_analysis, AnalysisConfig, AnalysisRecord, AnalysisSummary, FileReporter, HeightExport,
    ReportOptions,
};

const SCALE: f64 = 0.1172;

fn full_grid() -> PixelGrid {
    PixelGrid::new(96, 112, SCALE).unwrap()
}

fn dimple() -> TiltedGaussian {
    TiltedGaussian {
        amplitude: -0.5,
        x0: 0.3,
        y0: -0.2,
        sigma_x: 1.0,
        sigma_y: 0.8,
        theta: 0.3,
        offset: 0.0,
        tilt_x: 0.01,
        tilt_y: -0.005,
    }
}

fn dimple_stack() -> InterferogramStack {
    let height = gaussian_dimple(&full_grid(), &dimple(), UniformNoise::default());
    let phase = phase_from_height(&height, DEFAULT_WAVELENGTH_M, HeightSign::Positive);
    InterferogramSynth::new(PhaseStepCount::Six)
        .with_images_per_step(3)
        .with_fringes(700.0, 400.0)
        .with_noise(UniformNoise::new(99, 2.0))
        .stack(&phase)
        .unwrap()
        .with_filename("20170623T145259_interferograms.hdf5")
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        roi: Some(Roi::new(10, 12, 72, 84)),
        pixel_scale_um: SCALE,
        ..Default::default()
    }
}

#[test]
fn flat_stack_reconstructs_zero_height() {
    let stack = InterferogramSynth::new(PhaseStepCount::Five)
        .stack(&Map2::from_element(10, 10, 0.3))
        .unwrap();
    let demod = demodulate_stack(&stack, PhaseStepCount::Five, AveragingWindow::All).unwrap();
    assert!(demod.phase.iter().all(|p| (p - 0.3).abs() < 1e-9));
    assert!(demod.contrast.iter().all(|c| (c - 1.0).abs() < 1e-9));

    let region = height_in_roi(
        &demod.phase,
        &Roi::full(10, 10),
        &QualityGuidedUnwrapper,
        stack.wavelength_m(),
        HeightSign::Positive,
    )
    .unwrap();
    assert!(region.height.amax() < 1e-12);
}

#[test]
fn dimple_is_recovered_end_to_end() {
    let out = run_analysis(&dimple_stack(), &config()).unwrap();
    let truth = dimple();
    let g = &out.gaussian;

    assert_eq!(out.steps, PhaseStepCount::Six);
    assert_eq!(out.height.shape(), (72, 84));
    assert_eq!(out.wrapped_phase.shape(), (96, 112));
    assert!(!out.initial_guess.used_fallback);

    assert!((g.depth() - truth.amplitude).abs() < 2e-3, "depth {}", g.depth());
    assert!((g.model.sigma_x - truth.sigma_x).abs() < 5e-3);
    assert!((g.model.sigma_y - truth.sigma_y).abs() < 5e-3);
    assert!((g.model.theta - truth.theta).abs() < 1e-2);
    assert!((g.model.tilt_x - truth.tilt_x).abs() < 1e-4);
    assert!((g.model.tilt_y - truth.tilt_y).abs() < 1e-4);

    // detector pixel of the truth centre, from the un-cropped grid
    let (col, row) = full_grid().to_detector_px(truth.x0, truth.y0);
    assert!((g.centroid_px.0 - col).abs() < 0.05, "col {} vs {col}", g.centroid_px.0);
    assert!((g.centroid_px.1 - row).abs() < 0.05, "row {} vs {row}", g.centroid_px.1);

    assert!(g.model.sigma_x >= g.model.sigma_y);
    assert!(out.sphere.roc > 0.0 && out.sphere.is_derived_from(g));

    let record = AnalysisRecord::from_output(&out);
    assert_eq!(record.roi_left, 12);
    assert!((record.tilt_x_mrad - 10.0).abs() < 0.1);
    let summary = AnalysisSummary::from_output(&out, "20170623T150102").to_string();
    assert!(summary.contains("20170623T145259_interferograms.hdf5"));
    assert!(summary.contains("Sphere fit"));
}

#[test]
fn configuration_errors_fail_fast() {
    let stack = dimple_stack();

    let bad_roi = AnalysisConfig {
        roi: Some(Roi::new(50, 0, 60, 10)),
        ..config()
    };
    assert_eq!(run_analysis(&stack, &bad_roi).unwrap_err().kind(), ErrorKind::Configuration);

    let bad_steps = AnalysisConfig {
        use_steps: Some(4),
        ..config()
    };
    assert_eq!(run_analysis(&stack, &bad_steps).unwrap_err().kind(), ErrorKind::Configuration);

    let bad_window = AnalysisConfig {
        averaging: AveragingWindow::Range { start: 2, len: 2 },
        ..config()
    };
    assert_eq!(run_analysis(&stack, &bad_window).unwrap_err().kind(), ErrorKind::Configuration);
}

#[test]
fn file_reporter_writes_named_artefacts() {
    let out = run_analysis(&dimple_stack(), &config()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let reporter = FileReporter::new(
        dir.path(),
        ReportOptions {
            save_maps: true,
            ..Default::default()
        },
    );

    let written = reporter.report(&out, "20170623T150102").unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    let prefix = "20170623T145259_interferograms_20170623T150102_";
    for suffix in [
        "summary.txt",
        "record.csv",
        "height.json",
        "height.csv",
        "gaussian_fit.csv",
        "gaussian_residuals.csv",
        "sphere_residuals.csv",
    ] {
        assert!(names.contains(&format!("{prefix}{suffix}")), "missing {suffix}: {names:?}");
    }

    let file = std::fs::File::open(dir.path().join(format!("{prefix}height.json"))).unwrap();
    let export = HeightExport::read_json(file).unwrap();
    assert_eq!(export.roi, Roi::new(10, 12, 72, 84));
    assert!((export.extent_um.0 - 84.0 * SCALE).abs() < 1e-9);
    let map = export.to_map().unwrap();
    assert_eq!(map.shape(), (72, 84));
    assert!((map - &out.height).amax() < 1e-9);
}
