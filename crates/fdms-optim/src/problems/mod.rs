pub mod core_gaussian;
pub mod gaussian_tilt;
pub mod sphere_cap;
pub mod step_cosine;

use fdms_core::{AnalysisError, Map2, PixelGrid, Real};

/// Physical coordinates and heights of the grid points selected by `keep`.
///
/// Fails on the first non-finite height among the selected points.
pub(crate) fn collect_points(
    height: &Map2,
    grid: &PixelGrid,
    what: &'static str,
    mut keep: impl FnMut(Real, Real) -> bool,
) -> Result<(Vec<Real>, Vec<Real>, Vec<Real>), AnalysisError> {
    grid.check_shape(height)?;
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut zs = Vec::new();
    for (r, c, x, y) in grid.points() {
        if !keep(x, y) {
            continue;
        }
        let z = height[(r, c)];
        if !z.is_finite() {
            return Err(AnalysisError::NonFinite { what, row: r, col: c });
        }
        xs.push(x);
        ys.push(y);
        zs.push(z);
    }
    Ok((xs, ys, zs))
}
