//! Per-run record, summary text and the file reporter.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use fdms_core::{diameter, Map2, Real};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{AnalysisOutput, HeightExport, PipelineError, ReportOptions};

/// Timestamp format used in report file names and exports.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Format an analysis timestamp, e.g. `20170623T145259`.
pub fn analysis_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Fixed-column result record of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub filename: String,
    pub depth_um: Real,
    pub centroid_x_px: Real,
    pub centroid_y_px: Real,
    pub sigma_x_um: Real,
    pub sigma_y_um: Real,
    pub theta_deg: Real,
    /// `sigma_x_um` lies along `theta_deg + 90` on the measured surface.
    pub theta_relabelled: bool,
    pub offset_um: Real,
    pub tilt_x_mrad: Real,
    pub tilt_y_mrad: Real,
    pub roi_top: i64,
    pub roi_left: i64,
    pub roi_height: i64,
    pub roi_width: i64,
    pub roc_x_um: Real,
    pub roc_y_um: Real,
    pub roc_sphere_um: Real,
    pub ellipticity: Real,
    pub gaussian_residual_std_um: Real,
    pub sphere_residual_std_um: Real,
}

impl AnalysisRecord {
    pub fn from_output(output: &AnalysisOutput) -> Self {
        let g = &output.gaussian;
        let m = &g.model;
        Self {
            filename: output.filename.clone(),
            depth_um: g.depth(),
            centroid_x_px: g.centroid_px.0,
            centroid_y_px: g.centroid_px.1,
            sigma_x_um: m.sigma_x,
            sigma_y_um: m.sigma_y,
            theta_deg: g.theta_deg(),
            theta_relabelled: g.axes_relabelled,
            offset_um: m.offset,
            tilt_x_mrad: m.tilt_x * 1e3,
            tilt_y_mrad: m.tilt_y * 1e3,
            roi_top: output.roi.top,
            roi_left: output.roi.left,
            roi_height: output.roi.height,
            roi_width: output.roi.width,
            roc_x_um: g.roc_x(),
            roc_y_um: g.roc_y(),
            roc_sphere_um: output.sphere.roc,
            ellipticity: g.ellipticity(),
            gaussian_residual_std_um: g.residual_std,
            sphere_residual_std_um: output.sphere.residual_std,
        }
    }
}

/// Write `records` as CSV with a header row.
pub fn write_record_csv<W: Write>(records: &[AnalysisRecord], writer: W) -> Result<(), PipelineError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Human-readable summary of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    pub record: AnalysisRecord,
    pub timestamp: String,
    pub steps: usize,
    pub pixel_scale_um: Real,
    pub wavelength_m: Real,
    pub used_fallback_seed: bool,
    pub sphere_points: usize,
}

impl AnalysisSummary {
    pub fn from_output(output: &AnalysisOutput, timestamp: impl Into<String>) -> Self {
        Self {
            record: AnalysisRecord::from_output(output),
            timestamp: timestamp.into(),
            steps: output.steps.count(),
            pixel_scale_um: output.grid.scale_um,
            wavelength_m: output.wavelength_m,
            used_fallback_seed: output.initial_guess.used_fallback,
            sphere_points: output.sphere.num_points,
        }
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        writeln!(f, "Fibre dimple analysis")?;
        writeln!(f, "  file                : {}", r.filename)?;
        writeln!(f, "  analysed            : {}", self.timestamp)?;
        writeln!(f, "  phase steps         : {}", self.steps)?;
        writeln!(
            f,
            "  wavelength          : {:.1} nm, pixel scale {:.4} um",
            self.wavelength_m * 1e9,
            self.pixel_scale_um
        )?;
        writeln!(
            f,
            "  roi                 : top {} left {} height {} width {}",
            r.roi_top, r.roi_left, r.roi_height, r.roi_width
        )?;
        if self.used_fallback_seed {
            writeln!(f, "  note                : initial guess used fallback widths")?;
        }
        writeln!(f, "Gaussian fit")?;
        writeln!(f, "  depth               : {:.4} um", r.depth_um)?;
        writeln!(
            f,
            "  centroid            : ({:.2}, {:.2}) px",
            r.centroid_x_px, r.centroid_y_px
        )?;
        writeln!(
            f,
            "  sigma x / y         : {:.4} / {:.4} um",
            r.sigma_x_um, r.sigma_y_um
        )?;
        writeln!(
            f,
            "  diameter x / y      : {:.4} / {:.4} um",
            diameter(r.sigma_x_um),
            diameter(r.sigma_y_um)
        )?;
        writeln!(f, "  theta               : {:.2} deg", r.theta_deg)?;
        if r.theta_relabelled {
            writeln!(
                f,
                "  note                : sigma x lies along theta + 90 deg on the surface; \
                 refit with theta_convention half_turn"
            )?;
        }
        writeln!(f, "  ellipticity         : {:.4}", r.ellipticity)?;
        writeln!(f, "  offset              : {:.4} um", r.offset_um)?;
        writeln!(
            f,
            "  tilt x / y          : {:.4} / {:.4} mrad",
            r.tilt_x_mrad, r.tilt_y_mrad
        )?;
        writeln!(
            f,
            "  RoC x / y           : {:.3} / {:.3} um",
            r.roc_x_um, r.roc_y_um
        )?;
        writeln!(f, "  residual std        : {:.3e} um", r.gaussian_residual_std_um)?;
        writeln!(f, "Sphere fit")?;
        writeln!(
            f,
            "  RoC                 : {:.3} um over {} points",
            r.roc_sphere_um, self.sphere_points
        )?;
        write!(f, "  residual std        : {:.3e} um", r.sphere_residual_std_um)
    }
}

/// Write a map as a header-less CSV grid, one map row per line.
pub fn write_map_csv<W: Write>(map: &Map2, writer: W) -> Result<(), PipelineError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for row in map.row_iter() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the artefacts selected by [`ReportOptions`] into a directory as
/// `<stem>_<timestamp>_<suffix>`.
#[derive(Debug, Clone)]
pub struct FileReporter {
    out_dir: PathBuf,
    options: ReportOptions,
}

impl FileReporter {
    pub fn new(out_dir: impl Into<PathBuf>, options: ReportOptions) -> Self {
        Self {
            out_dir: out_dir.into(),
            options,
        }
    }

    /// Report with the current local time as the analysis timestamp.
    pub fn report_now(&self, output: &AnalysisOutput) -> Result<Vec<PathBuf>, PipelineError> {
        self.report(output, &analysis_timestamp(&Local::now()))
    }

    /// Write the selected artefacts and return the paths written.
    pub fn report(
        &self,
        output: &AnalysisOutput,
        timestamp: &str,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        fs::create_dir_all(&self.out_dir)?;
        let stem = file_stem(&output.filename);
        let path = |suffix: &str| self.out_dir.join(format!("{stem}_{timestamp}_{suffix}"));
        let mut written = Vec::new();

        if self.options.write_summary {
            let p = path("summary.txt");
            let summary = AnalysisSummary::from_output(output, timestamp);
            fs::write(&p, format!("{summary}\n"))?;
            written.push(p);
        }
        if self.options.write_record {
            let p = path("record.csv");
            write_record_csv(&[AnalysisRecord::from_output(output)], create(&p)?)?;
            written.push(p);
        }
        if self.options.export_height {
            let p = path("height.json");
            HeightExport::from_output(output, timestamp).write_json(create(&p)?)?;
            written.push(p);
        }
        if self.options.save_maps {
            let fitted = output.height.clone() - &output.gaussian.residuals;
            for (suffix, map) in [
                ("height.csv", &output.height),
                ("gaussian_fit.csv", &fitted),
                ("gaussian_residuals.csv", &output.gaussian.residuals),
                ("sphere_residuals.csv", &output.sphere.residuals),
            ] {
                let p = path(suffix);
                write_map_csv(map, create(&p)?)?;
                written.push(p);
            }
        }

        info!("wrote {} report files to {}", written.len(), self.out_dir.display());
        Ok(written)
    }
}

fn create(path: &Path) -> io::Result<BufWriter<File>> {
    File::create(path).map(BufWriter::new)
}

fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("analysis")
        .to_string()
}
