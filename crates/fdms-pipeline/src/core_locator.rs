//! Fibre-core location in a single intensity image.
//!
//! The core is the brightest spot when light is launched into the fibre.
//! A square window around the brightest pixel is fitted with an
//! axis-aligned Gaussian in pixel units.

use fdms_core::{AnalysisError, Map2, Real, Roi};
use fdms_optim::{fit_core_gaussian, AxisGaussian, SolveOptions, SolveReport};
use fdms_phase::{crop, d4sigma};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Width used when the window moments are unusable (px).
pub const FALLBACK_CORE_SIGMA_PX: Real = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreLocatorOptions {
    /// Side of the square fit window (px), clamped to the image.
    pub window_px: usize,
    pub solve: SolveOptions,
}

impl Default for CoreLocatorOptions {
    fn default() -> Self {
        Self {
            window_px: 100,
            solve: SolveOptions::default(),
        }
    }
}

/// Fitted core position in detector pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreLocation {
    pub x_px: Real,
    pub y_px: Real,
    pub sigma_x_px: Real,
    pub sigma_y_px: Real,
    pub amplitude: Real,
    pub offset: Real,
    /// Window the fit ran on.
    pub window: Roi,
    /// Set when the seed width fell back to [`FALLBACK_CORE_SIGMA_PX`].
    pub used_fallback: bool,
    pub report: SolveReport,
}

/// Locate the fibre core in `image`.
pub fn locate_core(image: &Map2, opts: &CoreLocatorOptions) -> Result<CoreLocation, AnalysisError> {
    let (rows, cols) = image.shape();
    if rows == 0 || cols == 0 {
        return Err(AnalysisError::EmptyMap { what: "core image" });
    }
    if let Some(pos) = image.iter().position(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite {
            what: "core image",
            row: pos % rows,
            col: pos / rows,
        });
    }

    let (peak_row, peak_col) = argmax(image);
    let window = centred_window(peak_row, peak_col, rows, cols, opts.window_px.max(1));
    let patch = crop(image, &window)?;
    debug!(
        "brightest pixel at ({peak_col}, {peak_row}); fitting window {window}"
    );

    let (min, max) = (patch.min(), patch.max());
    let moments = d4sigma(&patch);
    let used_fallback = !moments.is_usable();
    let (sigma_x, sigma_y) = if used_fallback {
        warn!("core window moments are degenerate; seeding sigma = {FALLBACK_CORE_SIGMA_PX} px");
        (FALLBACK_CORE_SIGMA_PX, FALLBACK_CORE_SIGMA_PX)
    } else {
        (moments.d4sigma_col / 8.0, moments.d4sigma_row / 8.0)
    };
    let seed = AxisGaussian {
        amplitude: max - min,
        x0: (peak_col as i64 - window.left) as Real,
        y0: (peak_row as i64 - window.top) as Real,
        sigma_x,
        sigma_y,
        offset: min,
    };

    let fit = fit_core_gaussian(&patch, &seed, &opts.solve)?;
    let spot = fit.spot;
    Ok(CoreLocation {
        x_px: spot.x0 + window.left as Real,
        y_px: spot.y0 + window.top as Real,
        sigma_x_px: spot.sigma_x,
        sigma_y_px: spot.sigma_y,
        amplitude: spot.amplitude,
        offset: spot.offset,
        window,
        used_fallback,
        report: fit.report,
    })
}

/// `(row, col)` of the largest value; the first one wins ties.
fn argmax(map: &Map2) -> (usize, usize) {
    let mut best = (0, 0);
    for c in 0..map.ncols() {
        for r in 0..map.nrows() {
            if map[(r, c)] > map[best] {
                best = (r, c);
            }
        }
    }
    best
}

fn centred_window(row: usize, col: usize, rows: usize, cols: usize, size: usize) -> Roi {
    let h = size.min(rows);
    let w = size.min(cols);
    let top = row.saturating_sub(h / 2).min(rows - h);
    let left = col.saturating_sub(w / 2).min(cols - w);
    Roi::new(top as i64, left as i64, h as i64, w as i64)
}
