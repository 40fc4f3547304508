//! Scalar aliases and small statistics helpers over 2-D maps.

use nalgebra::DMatrix;
use std::f64::consts::PI;

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// Dense 2-D map indexed as `map[(row, col)]`.
pub type Map2 = DMatrix<Real>;

/// Arithmetic mean of a sequence. Returns `NaN` for an empty sequence.
pub fn mean<I>(values: I) -> Real
where
    I: IntoIterator<Item = Real>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        Real::NAN
    } else {
        sum / n as Real
    }
}

/// Population standard deviation of a sequence. Returns `NaN` for an empty sequence.
pub fn std_dev<I>(values: I) -> Real
where
    I: IntoIterator<Item = Real>,
{
    let values: Vec<Real> = values.into_iter().collect();
    let m = mean(values.iter().copied());
    if values.is_empty() {
        return Real::NAN;
    }
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<Real>() / values.len() as Real;
    var.sqrt()
}

/// Mean over the rectangular block `[row0, row0 + rows) × [col0, col0 + cols)`.
///
/// The caller guarantees the block lies inside `map`.
pub fn block_mean(map: &Map2, row0: usize, col0: usize, rows: usize, cols: usize) -> Real {
    mean(map.view((row0, col0), (rows, cols)).iter().copied())
}

/// Standard deviation over the finite entries of a map (masked entries are `NaN`).
pub fn finite_std_dev(map: &Map2) -> Real {
    std_dev(map.iter().copied().filter(|v| v.is_finite()))
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_to_pi(angle: Real) -> Real {
    let mut a = angle.rem_euclid(2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    }
    a
}
