//! Forward surface models shared by the synthetic generators and the fitters.

use serde::{Deserialize, Serialize};

use crate::{Map2, PixelGrid, Real};

/// Tilted elliptical Gaussian on a planar background:
///
/// `g(x, y) = offset + amplitude·exp(−(a·dx² + 2b·dx·dy + c·dy²)) + tilt_x·x + tilt_y·y`
///
/// with `dx = x − x0`, `dy = y − y0` and
/// `a = cos²θ/(2σx²) + sin²θ/(2σy²)`,
/// `b = −sin2θ/(4σx²) + sin2θ/(4σy²)`,
/// `c = sin²θ/(2σx²) + cos²θ/(2σy²)`.
///
/// Lengths are micrometres; tilts are slopes (µm per µm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltedGaussian {
    pub amplitude: Real,
    pub x0: Real,
    pub y0: Real,
    pub sigma_x: Real,
    pub sigma_y: Real,
    pub theta: Real,
    pub offset: Real,
    pub tilt_x: Real,
    pub tilt_y: Real,
}

/// Quadratic-form coefficients `(a, b, c)` of a rotated elliptical Gaussian.
pub fn gaussian_coefficients(sigma_x: Real, sigma_y: Real, theta: Real) -> (Real, Real, Real) {
    let (s, c) = theta.sin_cos();
    let s2 = (2.0 * theta).sin();
    let sx2 = sigma_x * sigma_x;
    let sy2 = sigma_y * sigma_y;
    let a = c * c / (2.0 * sx2) + s * s / (2.0 * sy2);
    let b = -s2 / (4.0 * sx2) + s2 / (4.0 * sy2);
    let cc = s * s / (2.0 * sx2) + c * c / (2.0 * sy2);
    (a, b, cc)
}

impl TiltedGaussian {
    /// Evaluate the surface at physical coordinates `(x, y)`.
    pub fn eval(&self, x: Real, y: Real) -> Real {
        let (a, b, c) = gaussian_coefficients(self.sigma_x, self.sigma_y, self.theta);
        let dx = x - self.x0;
        let dy = y - self.y0;
        let q = a * dx * dx + 2.0 * b * dx * dy + c * dy * dy;
        self.offset + self.amplitude * (-q).exp() + self.tilt_x * x + self.tilt_y * y
    }

    /// Planar background only (`amplitude = 0`).
    pub fn plane(&self, x: Real, y: Real) -> Real {
        self.offset + self.tilt_x * x + self.tilt_y * y
    }

    /// Sample the surface on every grid point.
    pub fn render(&self, grid: &PixelGrid) -> Map2 {
        Map2::from_fn(grid.rows, grid.cols, |r, c| self.eval(grid.x_um(c), grid.y_um(r)))
    }

    /// Whether `(x, y)` lies strictly inside the axis-aligned 1/e ellipse
    /// `((x−x0)/σx)² + ((y−y0)/σy)² < 1`.
    pub fn inside_unit_ellipse(&self, x: Real, y: Real) -> bool {
        let u = (x - self.x0) / self.sigma_x;
        let v = (y - self.y0) / self.sigma_y;
        u * u + v * v < 1.0
    }
}

/// Sphere with centre `(x0, y0, z0)` and radius `radius` (µm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereCap {
    pub x0: Real,
    pub y0: Real,
    pub z0: Real,
    pub radius: Real,
}

impl SphereCap {
    /// Height of the lower cap (a concave dimple with the centre above the
    /// surface) at `(x, y)`, or `None` outside the sphere's footprint.
    pub fn lower_z(&self, x: Real, y: Real) -> Option<Real> {
        let rho2 = (x - self.x0).powi(2) + (y - self.y0).powi(2);
        let r2 = self.radius * self.radius;
        (rho2 <= r2).then(|| self.z0 - (r2 - rho2).sqrt())
    }

    /// Signed distance of `(x, y, z)` from the sphere surface.
    pub fn residual(&self, x: Real, y: Real, z: Real) -> Real {
        ((x - self.x0).powi(2) + (y - self.y0).powi(2) + (z - self.z0).powi(2)).sqrt()
            - self.radius
    }

    /// Render the lower cap; points outside the footprint are `NaN`.
    pub fn render_lower(&self, grid: &PixelGrid) -> Map2 {
        Map2::from_fn(grid.rows, grid.cols, |r, c| {
            self.lower_z(grid.x_um(c), grid.y_um(r))
                .unwrap_or(Real::NAN)
        })
    }
}
