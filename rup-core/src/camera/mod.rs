//! Camera intrinsics and the forward distortion model

mod distortion;
mod intrinsics;

pub use distortion::{predict_distorted, predict_distorted_with_jacobian, BrownConrady};
pub use intrinsics::Intrinsics;

/// Pixel coordinate (x right, y down)
pub type PixelPoint = nalgebra::Point2<f64>;
