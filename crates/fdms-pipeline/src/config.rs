use fdms_core::{AveragingWindow, HeightSign, Real, Roi, DEFAULT_PIXEL_SCALE_UM};
use fdms_optim::{GaussianFitOptions, SolveOptions};
use serde::{Deserialize, Serialize};

/// Settings for one analysis run.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Phase steps fed to the demodulator; `None` uses every stored step.
    /// Requests above the stored count are clamped with a warning.
    pub use_steps: Option<usize>,
    /// Region of interest in detector pixels; `None` analyses the full frame.
    pub roi: Option<Roi>,
    /// Object-plane pixel pitch (µm).
    pub pixel_scale_um: Real,
    /// Overrides the wavelength recorded with the stack.
    pub wavelength_m: Option<Real>,
    pub averaging: AveragingWindow,
    pub height_sign: HeightSign,
    pub gaussian: GaussianFitOptions,
    pub sphere: SolveOptions,
    /// Solver settings of the phase-step cosine fit.
    pub step_fit: SolveOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            use_steps: None,
            roi: None,
            pixel_scale_um: DEFAULT_PIXEL_SCALE_UM,
            wavelength_m: None,
            averaging: AveragingWindow::All,
            height_sign: HeightSign::Positive,
            gaussian: GaussianFitOptions::default(),
            sphere: SolveOptions::default(),
            step_fit: SolveOptions::default(),
        }
    }
}

/// Which artefacts the file reporter writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Human-readable summary (`<stem>_<timestamp>_summary.txt`).
    pub write_summary: bool,
    /// Fixed-column record (`<stem>_<timestamp>_record.csv`).
    pub write_record: bool,
    /// Height map with metadata (`<stem>_<timestamp>_height.json`).
    pub export_height: bool,
    /// Height, fit and residual grids as CSV for external plotting.
    pub save_maps: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            write_summary: true,
            write_record: true,
            export_height: true,
            save_maps: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdms_optim::ThetaConvention;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str(
            r#"{
                "use_steps": 5,
                "roi": {"top": 310, "left": 380, "height": 300, "width": 380},
                "averaging": {"type": "range", "start": 2, "len": 1},
                "height_sign": "negative",
                "gaussian": {"theta_convention": "half_turn"}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.use_steps, Some(5));
        assert_eq!(cfg.roi, Some(Roi::new(310, 380, 300, 380)));
        assert_eq!(cfg.averaging, AveragingWindow::legacy());
        assert_eq!(cfg.height_sign, HeightSign::Negative);
        assert_eq!(cfg.gaussian.theta_convention, ThetaConvention::HalfTurn);
        assert_eq!(cfg.pixel_scale_um, DEFAULT_PIXEL_SCALE_UM);
        assert_eq!(cfg.sphere, SolveOptions::default());
    }

    #[test]
    fn config_roundtrip() {
        let cfg = AnalysisConfig {
            wavelength_m: Some(632.8e-9),
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);

        let opts: ReportOptions = serde_json::from_str(r#"{"save_maps": true}"#).unwrap();
        assert!(opts.save_maps && opts.write_summary && opts.write_record);
    }
}
