pub mod camera;
pub mod error;
pub mod solver;
pub mod undistort;

pub use camera::{
    predict_distorted, predict_distorted_with_jacobian, BrownConrady, Intrinsics, PixelPoint,
};
pub use error::{IntrinsicsError, Result, RupError, SolveError};
pub use solver::{SolveSummary, SolverOptions, TerminationType};
pub use undistort::{undistort, PointUndistorter, SolveOutcome, DEFAULT_MAX_ITERATIONS};
