use super::{distortion::BrownConrady, PixelPoint};
use crate::error::IntrinsicsError;

/// Pinhole intrinsics with Brown-Conrady distortion.
///
/// Immutable once constructed; construction guarantees nonzero finite focal
/// lengths and a non-empty image.
#[derive(Debug, Clone, PartialEq)]
pub struct Intrinsics {
    width: usize,
    height: usize,
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
    distortion: BrownConrady,
}

impl Intrinsics {
    /// Create intrinsics with radial (k1, k2) and tangential (p1, p2) distortion
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: usize,
        height: usize,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        k1: f64,
        k2: f64,
        p1: f64,
        p2: f64,
    ) -> Result<Self, IntrinsicsError> {
        Self::with_distortion(
            width,
            height,
            fx,
            fy,
            cx,
            cy,
            BrownConrady::new(k1, k2, p1, p2),
        )
    }

    /// Create intrinsics with no distortion
    pub fn ideal(
        width: usize,
        height: usize,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
    ) -> Result<Self, IntrinsicsError> {
        Self::with_distortion(width, height, fx, fy, cx, cy, BrownConrady::default())
    }

    pub fn with_distortion(
        width: usize,
        height: usize,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        distortion: BrownConrady,
    ) -> Result<Self, IntrinsicsError> {
        if width == 0 || height == 0 {
            return Err(IntrinsicsError::InvalidImageSize { width, height });
        }

        let BrownConrady { k1, k2, p1, p2 } = distortion;
        let named = [
            ("fx", fx),
            ("fy", fy),
            ("cx", cx),
            ("cy", cy),
            ("k1", k1),
            ("k2", k2),
            ("p1", p1),
            ("p2", p2),
        ];
        if let Some(&(name, value)) = named.iter().find(|(_, v)| !v.is_finite()) {
            return Err(IntrinsicsError::NonFinite { name, value });
        }

        if fx == 0.0 {
            return Err(IntrinsicsError::ZeroFocalLength { axis: "fx" });
        }
        if fy == 0.0 {
            return Err(IntrinsicsError::ZeroFocalLength { axis: "fy" });
        }

        Ok(Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
            distortion,
        })
    }

    /// Get image dimensions (width, height)
    pub fn image_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get focal lengths
    pub fn focal_length(&self) -> (f64, f64) {
        (self.fx, self.fy)
    }

    /// Get principal point
    pub fn principal_point(&self) -> (f64, f64) {
        (self.cx, self.cy)
    }

    pub fn distortion(&self) -> &BrownConrady {
        &self.distortion
    }

    /// Pixel to normalized image coordinates
    pub fn normalize(&self, pixel: &PixelPoint) -> (f64, f64) {
        ((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy)
    }

    /// Normalized image coordinates to pixel
    pub fn denormalize(&self, x_norm: f64, y_norm: f64) -> PixelPoint {
        PixelPoint::new(x_norm * self.fx + self.cx, y_norm * self.fy + self.cy)
    }

    /// Outermost pixel centres: top-left, top-right, bottom-right, bottom-left
    pub fn image_corners(&self) -> [PixelPoint; 4] {
        let right = (self.width - 1) as f64;
        let bottom = (self.height - 1) as f64;
        [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(right, 0.0),
            PixelPoint::new(right, bottom),
            PixelPoint::new(0.0, bottom),
        ]
    }
}
