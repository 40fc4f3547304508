use std::io::{Read, Write};

use fdms_core::{AnalysisError, Map2, Real, Roi};
use serde::{Deserialize, Serialize};

use crate::{AnalysisOutput, PipelineError};

/// Height map plus the metadata needed to interpret it on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightExport {
    pub filename: String,
    /// Analysis timestamp (`%Y%m%dT%H%M%S`).
    pub timestamp: String,
    pub pixel_scale_um: Real,
    pub roi: Roi,
    /// Physical `(width, height)` of the map in micrometres.
    pub extent_um: (Real, Real),
    /// Heights in micrometres, one inner vector per map row.
    pub height_um: Vec<Vec<Real>>,
}

impl HeightExport {
    pub fn from_output(output: &AnalysisOutput, timestamp: impl Into<String>) -> Self {
        Self {
            filename: output.filename.clone(),
            timestamp: timestamp.into(),
            pixel_scale_um: output.grid.scale_um,
            roi: output.roi,
            extent_um: output.grid.extent_um(),
            height_um: map_to_rows(&output.height),
        }
    }

    /// Height map rebuilt from the exported rows.
    pub fn to_map(&self) -> Result<Map2, AnalysisError> {
        map_from_rows(&self.height_um)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), PipelineError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read_json<R: Read>(reader: R) -> Result<Self, PipelineError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Rows of `map` as nested vectors.
pub fn map_to_rows(map: &Map2) -> Vec<Vec<Real>> {
    map.row_iter().map(|row| row.iter().copied().collect()).collect()
}

/// Build a map from equally long rows.
pub fn map_from_rows(rows: &[Vec<Real>]) -> Result<Map2, AnalysisError> {
    let cols = rows.first().map_or(0, Vec::len);
    if let Some((r, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != cols) {
        return Err(AnalysisError::ShapeMismatch {
            expected: (r, cols),
            found: (r, row.len()),
        });
    }
    Ok(Map2::from_fn(rows.len(), cols, |r, c| rows[r][c]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_roundtrip_and_ragged_rows_fail() {
        let map = Map2::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let rows = map_to_rows(&map);
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(map_from_rows(&rows).unwrap(), map);

        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            map_from_rows(&ragged),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn export_json_roundtrip() {
        let export = HeightExport {
            filename: "20170623T145259_interferograms.hdf5".into(),
            timestamp: "20170623T150102".into(),
            pixel_scale_um: 0.1172,
            roi: Roi::new(310, 380, 2, 2),
            extent_um: (0.2344, 0.2344),
            height_um: vec![vec![0.0, -0.25], vec![-0.125, 0.5]],
        };
        let mut buf = Vec::new();
        export.write_json(&mut buf).unwrap();
        let back = HeightExport::read_json(buf.as_slice()).unwrap();
        assert_eq!(back, export);
        assert_eq!(back.to_map().unwrap()[(1, 0)], -0.125);
    }
}
