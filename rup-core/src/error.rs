use thiserror::Error;

/// Common errors across the undistortion workspace
#[derive(Error, Debug)]
pub enum RupError {
    #[error("Intrinsics error: {0}")]
    Intrinsics(#[from] IntrinsicsError),

    #[error("Solve error: {0}")]
    Solve(#[from] SolveError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Rejected camera parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntrinsicsError {
    #[error("Focal length {axis} must be nonzero")]
    ZeroFocalLength { axis: &'static str },

    #[error("Invalid image size: {width}x{height}")]
    InvalidImageSize { width: usize, height: usize },

    #[error("Parameter {name} is not finite: {value}")]
    NonFinite { name: &'static str, value: f64 },
}

/// Why a point solve terminated without converging
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Solve did not converge after {0} iterations")]
    MaxIterations(usize),

    #[error("Trust region radius {0:e} fell below the minimum without improvement")]
    NoImprovement(f64),

    #[error("Residual is not finite at the initial estimate")]
    NonFinite,
}

pub type Result<T> = std::result::Result<T, RupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsics_error_display() {
        let err = IntrinsicsError::ZeroFocalLength { axis: "fx" };
        assert_eq!(err.to_string(), "Focal length fx must be nonzero");

        let err = IntrinsicsError::InvalidImageSize {
            width: 0,
            height: 1080,
        };
        assert_eq!(err.to_string(), "Invalid image size: 0x1080");

        let err = IntrinsicsError::NonFinite {
            name: "k1",
            value: f64::NAN,
        };
        assert_eq!(err.to_string(), "Parameter k1 is not finite: NaN");
    }

    #[test]
    fn test_solve_error_display() {
        let err = SolveError::MaxIterations(50);
        assert_eq!(err.to_string(), "Solve did not converge after 50 iterations");

        let err = SolveError::NonFinite;
        assert_eq!(err.to_string(), "Residual is not finite at the initial estimate");

        let err = SolveError::NoImprovement(1e-33);
        assert!(err.to_string().contains("1e-33"));
    }

    #[test]
    fn test_rup_error_from_intrinsics_error() {
        let err: RupError = IntrinsicsError::ZeroFocalLength { axis: "fy" }.into();
        assert!(matches!(err, RupError::Intrinsics(_)));
        assert_eq!(err.to_string(), "Intrinsics error: Focal length fy must be nonzero");
    }

    #[test]
    fn test_rup_error_from_solve_error() {
        let err: RupError = SolveError::MaxIterations(1).into();
        assert!(matches!(err, RupError::Solve(_)));
    }

    #[test]
    fn test_rup_error_invalid_input() {
        let err = RupError::InvalidInput("Malformed point".to_string());
        assert_eq!(err.to_string(), "Invalid input: Malformed point");
    }
}
