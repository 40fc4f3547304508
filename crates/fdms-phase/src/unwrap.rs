//! 2-D phase unwrapping.
//!
//! [`PhaseUnwrapper`] is the seam the pipeline consumes; any algorithm that
//! keeps 4-neighbour differences equal to the wrapped differences modulo 2π
//! conforms. [`QualityGuidedUnwrapper`] is the implementation used by default.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fdms_core::{wrap_to_pi, AnalysisError, Map2, Real};
use log::debug;

/// Removes 2π ambiguities from a wrapped phase map.
pub trait PhaseUnwrapper {
    fn unwrap(&self, wrapped: &Map2) -> Result<Map2, AnalysisError>;
}

/// Quality-guided flood fill.
///
/// Pixel quality is `1 / (1 + mean |wrapped gradient|)` over the 4-neighbours.
/// Starting from the best pixel, the most reliable pixel on the frontier is
/// always unwrapped next, against the neighbour that queued it, so noisy
/// regions are reached last.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualityGuidedUnwrapper;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    quality: Real,
    index: usize,
    from: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // highest quality first, then lowest index for determinism
        self.quality
            .total_cmp(&other.quality)
            .then_with(|| other.index.cmp(&self.index))
    }
}

fn neighbours(rows: usize, cols: usize, r: usize, c: usize) -> impl Iterator<Item = (usize, usize)> {
    let up = (r > 0).then(|| (r - 1, c));
    let down = (r + 1 < rows).then(|| (r + 1, c));
    let left = (c > 0).then(|| (r, c - 1));
    let right = (c + 1 < cols).then(|| (r, c + 1));
    [up, down, left, right].into_iter().flatten()
}

/// Per-pixel reliability in `(0, 1]`.
pub fn phase_quality(wrapped: &Map2) -> Map2 {
    let (rows, cols) = wrapped.shape();
    Map2::from_fn(rows, cols, |r, c| {
        let (sum, n) = neighbours(rows, cols, r, c).fold((0.0, 0usize), |(s, n), nb| {
            (s + wrap_to_pi(wrapped[nb] - wrapped[(r, c)]).abs(), n + 1)
        });
        let mean = if n == 0 { 0.0 } else { sum / n as Real };
        1.0 / (1.0 + mean)
    })
}

impl PhaseUnwrapper for QualityGuidedUnwrapper {
    fn unwrap(&self, wrapped: &Map2) -> Result<Map2, AnalysisError> {
        let (rows, cols) = wrapped.shape();
        if rows == 0 || cols == 0 {
            return Err(AnalysisError::EmptyMap {
                what: "wrapped phase",
            });
        }
        if let Some(pos) = wrapped.iter().position(|v| !v.is_finite()) {
            // column-major storage
            return Err(AnalysisError::NonFinite {
                what: "wrapped phase",
                row: pos % rows,
                col: pos / rows,
            });
        }

        let quality = phase_quality(wrapped);
        let at = |i: usize| (i / cols, i % cols);
        let idx = |(r, c): (usize, usize)| r * cols + c;

        let start = (0..rows * cols)
            .map(|i| Candidate {
                quality: quality[at(i)],
                index: i,
                from: i,
            })
            .max()
            .map_or(0, |c| c.index);
        debug!(
            "unwrapping {}x{} map from pixel {:?} (quality {:.3})",
            rows,
            cols,
            at(start),
            quality[at(start)]
        );

        let mut out = Map2::zeros(rows, cols);
        let mut done = vec![false; rows * cols];
        let mut heap = BinaryHeap::new();
        heap.push(Candidate {
            quality: quality[at(start)],
            index: start,
            from: start,
        });

        while let Some(Candidate { index, from, .. }) = heap.pop() {
            if done[index] {
                continue;
            }
            let p = at(index);
            out[p] = if index == from {
                wrapped[p]
            } else {
                let q = at(from);
                out[q] + wrap_to_pi(wrapped[p] - wrapped[q])
            };
            done[index] = true;

            for nb in neighbours(rows, cols, p.0, p.1) {
                let n = idx(nb);
                if !done[n] {
                    heap.push(Candidate {
                        quality: quality[nb],
                        index: n,
                        from: index,
                    });
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdms_core::ErrorKind;
    use std::f64::consts::PI;

    fn wrap_map(m: &Map2) -> Map2 {
        m.map(wrap_to_pi)
    }

    fn assert_equal_up_to_constant_2pi(got: &Map2, truth: &Map2) {
        let shift = got[(0, 0)] - truth[(0, 0)];
        let k = (shift / (2.0 * PI)).round();
        assert!((shift - k * 2.0 * PI).abs() < 1e-9, "shift {shift}");
        for (g, t) in got.iter().zip(truth.iter()) {
            assert!((g - t - shift).abs() < 1e-9, "got {g}, truth {t}");
        }
    }

    #[test]
    fn unwraps_a_tilted_plane() {
        let truth = Map2::from_fn(20, 25, |r, c| 0.7 * c as Real - 0.4 * r as Real);
        let out = QualityGuidedUnwrapper.unwrap(&wrap_map(&truth)).unwrap();
        assert_equal_up_to_constant_2pi(&out, &truth);
    }

    #[test]
    fn unwraps_a_deep_bowl() {
        let truth = Map2::from_fn(31, 31, |r, c| {
            let x = c as Real - 15.0;
            let y = r as Real - 15.0;
            -12.0 * (-(x * x + y * y) / 60.0).exp()
        });
        let out = QualityGuidedUnwrapper.unwrap(&wrap_map(&truth)).unwrap();
        assert_equal_up_to_constant_2pi(&out, &truth);
    }

    #[test]
    fn neighbour_differences_match_wrapped_differences() {
        let truth = Map2::from_fn(12, 9, |r, c| ((r * c) as Real * 0.3).sin() * 5.0);
        let wrapped = wrap_map(&truth);
        let out = QualityGuidedUnwrapper.unwrap(&wrapped).unwrap();
        for r in 0..12 {
            for c in 0..8 {
                let du = out[(r, c + 1)] - out[(r, c)];
                let dw = wrapped[(r, c + 1)] - wrapped[(r, c)];
                let k = (du - dw) / (2.0 * PI);
                assert!((k - k.round()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn uniform_phase_is_unchanged() {
        let wrapped = Map2::from_element(10, 10, 0.3);
        let out = QualityGuidedUnwrapper.unwrap(&wrapped).unwrap();
        assert!(out.iter().all(|v| (v - 0.3).abs() < 1e-12));
    }

    #[test]
    fn rejects_empty_and_non_finite_input() {
        let err = QualityGuidedUnwrapper.unwrap(&Map2::zeros(0, 4)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let mut m = Map2::zeros(3, 3);
        m[(2, 1)] = Real::NAN;
        let err = QualityGuidedUnwrapper.unwrap(&m).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::NonFinite {
                what: "wrapped phase",
                row: 2,
                col: 1
            }
        );
    }
}
