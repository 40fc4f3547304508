use fdms_core::{Map2, Real};

/// Intensity-weighted first and second moments of a map, in pixels.
///
/// `d4sigma_*` is four times the weighted standard deviation along an axis.
/// Every field is `NaN` when the weights sum to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamMoments {
    pub centroid_col: Real,
    pub centroid_row: Real,
    pub d4sigma_col: Real,
    pub d4sigma_row: Real,
}

impl BeamMoments {
    /// Whether both widths are finite and strictly positive.
    pub fn is_usable(&self) -> bool {
        [self.centroid_col, self.centroid_row].iter().all(|v| v.is_finite())
            && [self.d4sigma_col, self.d4sigma_row]
                .iter()
                .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// D4σ moments of `map` after shifting its minimum to zero.
pub fn d4sigma(map: &Map2) -> BeamMoments {
    let floor = map.min();
    let weights = map.add_scalar(-floor);
    let total = weights.sum();

    let mut col_sum = 0.0;
    let mut row_sum = 0.0;
    for ((r, c), w) in indexed(&weights) {
        col_sum += w * c;
        row_sum += w * r;
    }
    let cc = col_sum / total;
    let cr = row_sum / total;

    let mut col_var = 0.0;
    let mut row_var = 0.0;
    for ((r, c), w) in indexed(&weights) {
        col_var += w * (c - cc) * (c - cc);
        row_var += w * (r - cr) * (r - cr);
    }

    BeamMoments {
        centroid_col: cc,
        centroid_row: cr,
        d4sigma_col: 4.0 * (col_var / total).sqrt(),
        d4sigma_row: 4.0 * (row_var / total).sqrt(),
    }
}

fn indexed(map: &Map2) -> impl Iterator<Item = ((Real, Real), Real)> + '_ {
    let rows = map.nrows();
    // column-major storage
    map.iter()
        .enumerate()
        .map(move |(i, &w)| (((i % rows) as Real, (i / rows) as Real), w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_spot_moments() {
        let sigma = 4.0;
        let map = Map2::from_fn(81, 61, |r, c| {
            let dx = c as Real - 25.0;
            let dy = r as Real - 45.0;
            (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
        });
        let m = d4sigma(&map);
        assert!(m.is_usable());
        assert!((m.centroid_col - 25.0).abs() < 1e-6);
        assert!((m.centroid_row - 45.0).abs() < 1e-6);
        assert!((m.d4sigma_col - 4.0 * sigma).abs() < 1e-3, "{}", m.d4sigma_col);
        assert!((m.d4sigma_row - 4.0 * sigma).abs() < 1e-3, "{}", m.d4sigma_row);
    }

    #[test]
    fn flat_map_is_degenerate() {
        let m = d4sigma(&Map2::from_element(5, 5, 2.0));
        assert!(m.centroid_col.is_nan());
        assert!(!m.is_usable());
    }
}
