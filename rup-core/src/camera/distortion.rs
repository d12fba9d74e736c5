use super::{Intrinsics, PixelPoint};
use nalgebra::Matrix2;

/// Brown-Conrady lens distortion with two radial and two tangential terms
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrownConrady {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
}

impl BrownConrady {
    pub fn new(k1: f64, k2: f64, p1: f64, p2: f64) -> Self {
        Self { k1, k2, p1, p2 }
    }

    /// True when every coefficient is zero
    pub fn is_identity(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0 && self.p1 == 0.0 && self.p2 == 0.0
    }

    /// Apply distortion to normalized image coordinates
    pub fn distort(&self, x_norm: f64, y_norm: f64) -> (f64, f64) {
        let Self { k1, k2, p1, p2 } = *self;

        let r2 = x_norm * x_norm + y_norm * y_norm;
        let radial = 1.0 + k1 * r2 + k2 * r2 * r2;

        let x_dist = x_norm * radial
            + 2.0 * p1 * x_norm * y_norm
            + p2 * (r2 + 2.0 * x_norm * x_norm);

        let y_dist = y_norm * radial
            + p1 * (r2 + 2.0 * y_norm * y_norm)
            + 2.0 * p2 * x_norm * y_norm;

        (x_dist, y_dist)
    }

    /// Jacobian of [`distort`](Self::distort) with respect to the normalized
    /// coordinates, rows (x', y'), columns (x, y)
    pub fn jacobian(&self, x_norm: f64, y_norm: f64) -> Matrix2<f64> {
        let Self { k1, k2, p1, p2 } = *self;
        let (x, y) = (x_norm, y_norm);

        let r2 = x * x + y * y;
        let radial = 1.0 + k1 * r2 + k2 * r2 * r2;
        // d(radial)/d(r2)
        let dradial = k1 + 2.0 * k2 * r2;
        let dradial_dx = 2.0 * x * dradial;
        let dradial_dy = 2.0 * y * dradial;

        let dxd_dx = radial + x * dradial_dx + 2.0 * p1 * y + 6.0 * p2 * x;
        let dxd_dy = x * dradial_dy + 2.0 * p1 * x + 2.0 * p2 * y;
        let dyd_dx = y * dradial_dx + 2.0 * p1 * x + 2.0 * p2 * y;
        let dyd_dy = radial + y * dradial_dy + 6.0 * p1 * y + 2.0 * p2 * x;

        Matrix2::new(dxd_dx, dxd_dy, dyd_dx, dyd_dy)
    }
}

/// Predict where an undistorted pixel lands once the lens distortion is applied
pub fn predict_distorted(undistorted: &PixelPoint, intrinsics: &Intrinsics) -> PixelPoint {
    let (x_norm, y_norm) = intrinsics.normalize(undistorted);
    let (x_dist, y_dist) = intrinsics.distortion().distort(x_norm, y_norm);
    intrinsics.denormalize(x_dist, y_dist)
}

/// Same as [`predict_distorted`], also returning the 2x2 pixel-space Jacobian
/// of the predicted point with respect to the undistorted point.
pub fn predict_distorted_with_jacobian(
    undistorted: &PixelPoint,
    intrinsics: &Intrinsics,
) -> (PixelPoint, Matrix2<f64>) {
    let (fx, fy) = intrinsics.focal_length();
    let (x_norm, y_norm) = intrinsics.normalize(undistorted);
    let distortion = intrinsics.distortion();

    let (x_dist, y_dist) = distortion.distort(x_norm, y_norm);
    let j = distortion.jacobian(x_norm, y_norm);

    // diag(fx, fy) * J * diag(1/fx, 1/fy)
    let jacobian = Matrix2::new(
        j[(0, 0)],
        j[(0, 1)] * fx / fy,
        j[(1, 0)] * fy / fx,
        j[(1, 1)],
    );

    (intrinsics.denormalize(x_dist, y_dist), jacobian)
}
