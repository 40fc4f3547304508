//! `fdms` command-line front end.
//!
//! Every subcommand reads JSON from disk and prints a JSON report on stdout.
//! Log output goes to stderr; `-v` raises the level, `RUST_LOG` overrides it.

use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use fdms_core::{InterferogramStack, Real, Roi};
use fdms_phase::QualityGuidedUnwrapper;
use fdms_pipeline::export::map_from_rows;
use fdms_pipeline::{
    calibrate_stack_steps, locate_core, run_analysis, AnalysisConfig, AnalysisRecord,
    CoreLocatorOptions, FileReporter, ReportOptions,
};
use log::{info, LevelFilter};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "fdms", version, about = "Fibre-dimple interferometric analysis")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconstruct and fit the dimple in an interferogram stack.
    Analyze {
        /// Path to a JSON interferogram stack.
        #[arg(long)]
        input: PathBuf,

        /// Optional JSON AnalysisConfig. Defaults are used if omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for summary, record and height export files.
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Also write the height, fit and residual maps as CSV.
        #[arg(long)]
        save_maps: bool,
    },
    /// Locate the fibre core in a single intensity image.
    LocateCore {
        /// Path to a JSON image given as an array of rows.
        #[arg(long)]
        input: PathBuf,

        /// Side of the square fit window in pixels.
        #[arg(long, default_value_t = 100)]
        window: usize,
    },
    /// Check that one piezo step shifts the phase by a quarter wave.
    StepCheck {
        /// Path to a JSON interferogram stack.
        #[arg(long)]
        input: PathBuf,

        /// Region averaged per step, as `top,left,height,width`.
        #[arg(long, value_parser = parse_roi)]
        roi: Roi,

        /// Optional JSON AnalysisConfig. Defaults are used if omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Stdout report of the `analyze` subcommand.
#[derive(Debug, Serialize)]
struct AnalyzeReport {
    record: AnalysisRecord,
    used_fallback_seed: bool,
    files: Vec<PathBuf>,
}

fn parse_roi(s: &str) -> Result<Roi, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid ROI '{s}': {e}"))?;
    match parts.as_slice() {
        &[top, left, height, width] => Ok(Roi::new(top, left, height, width)),
        _ => Err(format!(
            "invalid ROI '{s}': expected top,left,height,width"
        )),
    }
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => load_json_file(p),
        None => Ok(AnalysisConfig::default()),
    }
}

fn run_analyze_from_files(
    input: &Path,
    config: Option<&Path>,
    out_dir: Option<&Path>,
    save_maps: bool,
) -> Result<String> {
    let stack: InterferogramStack = load_json_file(input)?;
    let config = load_config(config)?;
    let output = run_analysis(&stack, &config)
        .with_context(|| format!("analysing {}", input.display()))?;

    let files = match out_dir {
        Some(dir) => {
            let options = ReportOptions {
                save_maps,
                ..ReportOptions::default()
            };
            FileReporter::new(dir, options)
                .report_now(&output)
                .with_context(|| format!("writing reports to {}", dir.display()))?
        }
        None => Vec::new(),
    };

    let report = AnalyzeReport {
        record: AnalysisRecord::from_output(&output),
        used_fallback_seed: output.initial_guess.used_fallback,
        files,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn run_locate_core_from_file(input: &Path, window: usize) -> Result<String> {
    let rows: Vec<Vec<Real>> = load_json_file(input)?;
    let image = map_from_rows(&rows).with_context(|| format!("image in {}", input.display()))?;
    let opts = CoreLocatorOptions {
        window_px: window,
        ..CoreLocatorOptions::default()
    };
    let location = locate_core(&image, &opts)?;
    info!(
        "core at ({:.2}, {:.2}) px",
        location.x_px, location.y_px
    );
    Ok(serde_json::to_string_pretty(&location)?)
}

fn run_step_check_from_files(input: &Path, roi: &Roi, config: Option<&Path>) -> Result<String> {
    let stack: InterferogramStack = load_json_file(input)?;
    let config = load_config(config)?;
    let calibration = calibrate_stack_steps(&stack, roi, &config, &QualityGuidedUnwrapper)?;
    info!(
        "step period {:.4} (1.0 is a quarter wave per step)",
        calibration.fit.period
    );
    Ok(serde_json::to_string_pretty(&calibration)?)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let json = match &cli.command {
        Commands::Analyze {
            input,
            config,
            out_dir,
            save_maps,
        } => run_analyze_from_files(input, config.as_deref(), out_dir.as_deref(), *save_maps)?,
        Commands::LocateCore { input, window } => run_locate_core_from_file(input, *window)?,
        Commands::StepCheck { input, roi, config } => {
            run_step_check_from_files(input, roi, config.as_deref())?
        }
    };
    println!("{json}");
    Ok(())
}
