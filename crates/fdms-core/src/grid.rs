use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Map2, Real, RoiBounds};

/// Default object-plane pixel size in micrometres
/// (50× objective, 200 mm tube lens, 5.86 µm detector pixels).
pub const DEFAULT_PIXEL_SCALE_UM: Real = 0.1172;

/// Maps pixel indices of an ROI-cropped map to physical coordinates.
///
/// Physical coordinates are micrometres with the origin at the map centre:
/// `x = (col − cols/2)·scale`, `y = (row − rows/2)·scale`. The ROI origin
/// relates map indices back to detector pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelGrid {
    pub rows: usize,
    pub cols: usize,
    /// Pixel pitch in the object plane (µm).
    pub scale_um: Real,
    /// Detector row of map row 0.
    pub top: usize,
    /// Detector column of map column 0.
    pub left: usize,
}

impl PixelGrid {
    pub fn new(rows: usize, cols: usize, scale_um: Real) -> Result<Self, AnalysisError> {
        AnalysisError::check_positive("pixel_scale_um", scale_um)?;
        Ok(Self {
            rows,
            cols,
            scale_um,
            top: 0,
            left: 0,
        })
    }

    /// Grid for a map cropped with `bounds` from the detector frame.
    pub fn for_roi(bounds: &RoiBounds, scale_um: Real) -> Result<Self, AnalysisError> {
        let mut grid = Self::new(bounds.height(), bounds.width(), scale_um)?;
        grid.top = bounds.top();
        grid.left = bounds.left();
        Ok(grid)
    }

    /// Grid matching the shape of `map`, origin at detector `(0, 0)`.
    pub fn for_map(map: &Map2, scale_um: Real) -> Result<Self, AnalysisError> {
        Self::new(map.nrows(), map.ncols(), scale_um)
    }

    pub fn x_um(&self, col: usize) -> Real {
        (col as Real - self.cols as Real / 2.0) * self.scale_um
    }

    pub fn y_um(&self, row: usize) -> Real {
        (row as Real - self.rows as Real / 2.0) * self.scale_um
    }

    /// Detector pixel `(col, row)` of a physical point.
    pub fn to_detector_px(&self, x_um: Real, y_um: Real) -> (Real, Real) {
        (
            x_um / self.scale_um + self.cols as Real / 2.0 + self.left as Real,
            y_um / self.scale_um + self.rows as Real / 2.0 + self.top as Real,
        )
    }

    /// Physical coordinates of a fractional map index `(col, row)`.
    pub fn map_px_to_um(&self, col: Real, row: Real) -> (Real, Real) {
        (
            (col - self.cols as Real / 2.0) * self.scale_um,
            (row - self.rows as Real / 2.0) * self.scale_um,
        )
    }

    /// Physical extent `(width, height)` in micrometres.
    pub fn extent_um(&self) -> (Real, Real) {
        (
            self.cols as Real * self.scale_um,
            self.rows as Real * self.scale_um,
        )
    }

    /// Check that `map` has this grid's shape.
    pub fn check_shape(&self, map: &Map2) -> Result<(), AnalysisError> {
        if map.shape() == (self.rows, self.cols) {
            Ok(())
        } else {
            Err(AnalysisError::ShapeMismatch {
                expected: (self.rows, self.cols),
                found: map.shape(),
            })
        }
    }

    /// Iterate `(row, col, x_um, y_um)` over the grid in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (usize, usize, Real, Real)> + '_ {
        (0..self.rows).flat_map(move |r| {
            let y = self.y_um(r);
            (0..self.cols).map(move |c| (r, c, self.x_um(c), y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Roi;

    #[test]
    fn centred_coordinates() {
        let g = PixelGrid::new(10, 20, 0.5).unwrap();
        assert_eq!(g.x_um(10), 0.0);
        assert_eq!(g.y_um(5), 0.0);
        assert_eq!(g.x_um(0), -5.0);
        assert_eq!(g.extent_um(), (10.0, 5.0));
    }

    #[test]
    fn detector_mapping_includes_roi_offset() {
        let bounds = Roi::new(100, 200, 40, 60).validate(512, 512).unwrap();
        let g = PixelGrid::for_roi(&bounds, 0.1).unwrap();
        let (col, row) = g.to_detector_px(0.0, 0.0);
        assert!((col - 230.0).abs() < 1e-9);
        assert!((row - 120.0).abs() < 1e-9);
        let (col, row) = g.to_detector_px(g.x_um(7), g.y_um(3));
        assert!((col - 207.0).abs() < 1e-9);
        assert!((row - 103.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(PixelGrid::new(4, 4, 0.0).is_err());
    }

    #[test]
    fn points_are_row_major() {
        let g = PixelGrid::new(2, 3, 1.0).unwrap();
        let idx: Vec<(usize, usize)> = g.points().map(|(r, c, _, _)| (r, c)).collect();
        assert_eq!(idx, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }
}
