use fdms_core::{AnalysisError, Map2, Roi, RoiBounds};

/// Crop `map` to `roi`, validating the ROI before any indexing.
pub fn crop(map: &Map2, roi: &Roi) -> Result<Map2, AnalysisError> {
    select_region(map, roi).map(|(cropped, _)| cropped)
}

/// Crop `map` to `roi` and return the validated bounds alongside.
pub fn select_region(map: &Map2, roi: &Roi) -> Result<(Map2, RoiBounds), AnalysisError> {
    let bounds = roi.validate(map.nrows(), map.ncols())?;
    let cropped = map
        .view((bounds.top(), bounds.left()), (bounds.height(), bounds.width()))
        .into_owned();
    Ok((cropped, bounds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdms_core::{ErrorKind, Real};

    fn frame() -> Map2 {
        Map2::from_fn(8, 10, |r, c| (r * 100 + c) as Real)
    }

    #[test]
    fn crop_has_roi_shape_and_content() {
        let out = crop(&frame(), &Roi::new(2, 3, 4, 5)).unwrap();
        assert_eq!(out.shape(), (4, 5));
        assert_eq!(out[(0, 0)], 203.0);
        assert_eq!(out[(3, 4)], 507.0);

        let full = crop(&frame(), &Roi::full(8, 10)).unwrap();
        assert_eq!(full, frame());
    }

    #[test]
    fn out_of_bounds_roi_is_rejected() {
        for roi in [
            Roi::new(-1, 0, 2, 2),
            Roi::new(0, -3, 2, 2),
            Roi::new(5, 0, 4, 2),
            Roi::new(0, 6, 2, 5),
            Roi::new(0, 0, 0, 2),
            Roi::new(i64::MAX - 1, 0, 4, 2),
        ] {
            let err = crop(&frame(), &roi).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{roi:?}");
        }
    }
}
