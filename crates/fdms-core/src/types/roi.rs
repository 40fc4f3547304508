use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::{AnalysisError, RoiViolation};

/// Region of interest `(top, left, height, width)` in detector pixels.
///
/// Signed so that out-of-range user input can be represented and rejected
/// before any array indexing happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub top: i64,
    pub left: i64,
    pub height: i64,
    pub width: i64,
}

/// A validated ROI expressed as index ranges into a `rows × cols` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiBounds {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl Roi {
    pub fn new(top: i64, left: i64, height: i64, width: i64) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    /// ROI covering a full `rows × cols` frame.
    pub fn full(rows: usize, cols: usize) -> Self {
        Self::new(0, 0, rows as i64, cols as i64)
    }

    /// Check the ROI against a `rows × cols` frame.
    ///
    /// Requires `top, left >= 0`, `height, width > 0`, `top + height <= rows`
    /// and `left + width <= cols`.
    pub fn validate(&self, rows: usize, cols: usize) -> Result<RoiBounds, AnalysisError> {
        let violation = if self.top < 0 || self.left < 0 {
            Some(RoiViolation::NegativeOrigin)
        } else if self.height <= 0 || self.width <= 0 {
            Some(RoiViolation::Empty)
        } else if self.top.saturating_add(self.height) > rows as i64 {
            Some(RoiViolation::ExceedsHeight)
        } else if self.left.saturating_add(self.width) > cols as i64 {
            Some(RoiViolation::ExceedsWidth)
        } else {
            None
        };

        if let Some(violation) = violation {
            return Err(AnalysisError::InvalidRoi {
                roi: *self,
                rows,
                cols,
                violation,
            });
        }

        let top = self.top as usize;
        let left = self.left as usize;
        Ok(RoiBounds {
            rows: top..top + self.height as usize,
            cols: left..left + self.width as usize,
        })
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}, {}:{}]",
            self.top,
            self.top.saturating_add(self.height),
            self.left,
            self.left.saturating_add(self.width)
        )
    }
}

impl RoiBounds {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.cols.len()
    }

    pub fn top(&self) -> usize {
        self.rows.start
    }

    pub fn left(&self) -> usize {
        self.cols.start
    }

    pub fn to_roi(&self) -> Roi {
        Roi::new(
            self.top() as i64,
            self.left() as i64,
            self.height() as i64,
            self.width() as i64,
        )
    }
}
