//! Recover undistorted pixels by inverting the distortion model point by point

use nalgebra::{Matrix2, Vector2};
use rayon::prelude::*;

use crate::camera::{predict_distorted_with_jacobian, Intrinsics, PixelPoint};
use crate::error::{Result, SolveError};
use crate::solver::{
    LeastSquaresProblem, LevenbergMarquardt, SolveSummary, SolverOptions, Termination,
};

pub use crate::solver::DEFAULT_MAX_ITERATIONS;

/// Residual between an observed distorted pixel and the model prediction
struct PointResidual<'a> {
    observed: PixelPoint,
    intrinsics: &'a Intrinsics,
}

impl LeastSquaresProblem for PointResidual<'_> {
    fn evaluate(&self, x: &Vector2<f64>) -> (Vector2<f64>, Matrix2<f64>) {
        let (predicted, jacobian) =
            predict_distorted_with_jacobian(&PixelPoint::from(*x), self.intrinsics);
        (self.observed - predicted, -jacobian)
    }
}

/// Result of undistorting one point
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Converged {
        point: PixelPoint,
        summary: SolveSummary,
    },
    Failed {
        reason: SolveError,
        last_estimate: PixelPoint,
        summary: SolveSummary,
    },
}

impl SolveOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, SolveOutcome::Converged { .. })
    }

    /// Undistorted point, only when the solve converged
    pub fn point(&self) -> Option<PixelPoint> {
        match self {
            SolveOutcome::Converged { point, .. } => Some(*point),
            SolveOutcome::Failed { .. } => None,
        }
    }

    /// Final estimate regardless of how the solve ended
    pub fn estimate(&self) -> PixelPoint {
        match self {
            SolveOutcome::Converged { point, .. } => *point,
            SolveOutcome::Failed { last_estimate, .. } => *last_estimate,
        }
    }

    pub fn summary(&self) -> &SolveSummary {
        match self {
            SolveOutcome::Converged { summary, .. } | SolveOutcome::Failed { summary, .. } => {
                summary
            }
        }
    }

    pub fn into_result(self) -> Result<PixelPoint> {
        match self {
            SolveOutcome::Converged { point, .. } => Ok(point),
            SolveOutcome::Failed { reason, .. } => Err(reason.into()),
        }
    }
}

/// Inverts the distortion of a fixed camera for any number of observed points
#[derive(Debug, Clone)]
pub struct PointUndistorter {
    intrinsics: Intrinsics,
    solver: LevenbergMarquardt,
}

impl PointUndistorter {
    pub fn new(intrinsics: Intrinsics) -> Self {
        Self::with_options(intrinsics, SolverOptions::default())
    }

    pub fn with_options(intrinsics: Intrinsics, options: SolverOptions) -> Self {
        Self {
            intrinsics,
            solver: LevenbergMarquardt::new(options),
        }
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// Solve for the undistorted point, seeded with the observation itself
    pub fn undistort(&self, observed: &PixelPoint) -> SolveOutcome {
        let problem = PointResidual {
            observed: *observed,
            intrinsics: &self.intrinsics,
        };

        let (x, summary) = self.solver.minimize(&problem, observed.coords);
        let estimate = PixelPoint::from(x);

        match summary.termination.clone() {
            Termination::Converged(_) => SolveOutcome::Converged {
                point: estimate,
                summary,
            },
            Termination::Failed(reason) => SolveOutcome::Failed {
                reason,
                last_estimate: estimate,
                summary,
            },
        }
    }

    /// Solve every point independently on the rayon pool; output order matches input
    pub fn undistort_all(&self, observed: &[PixelPoint]) -> Vec<SolveOutcome> {
        observed.par_iter().map(|p| self.undistort(p)).collect()
    }
}

/// Undistort one observed pixel with the default solver settings and the given iteration cap
pub fn undistort(
    observed: &PixelPoint,
    intrinsics: &Intrinsics,
    max_iterations: usize,
) -> SolveOutcome {
    let options = SolverOptions::default().with_max_iterations(max_iterations);
    PointUndistorter::with_options(intrinsics.clone(), options).undistort(observed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::predict_distorted;
    use crate::error::RupError;
    use crate::solver::TerminationType;

    fn camera() -> Intrinsics {
        Intrinsics::new(
            1920, 1080, 1738.06409, 1736.96128, 965.222, 666.6185, -0.34592, 0.16969, -0.00279,
            0.00235,
        )
        .unwrap()
    }

    #[test]
    fn zero_distortion_converges_immediately() {
        let camera =
            Intrinsics::ideal(1920, 1080, 1738.06409, 1736.96128, 965.222, 666.6185).unwrap();

        for &(u, v) in &[(0.0, 0.0), (1919.0, 1079.0), (400.25, 77.5)] {
            let outcome = undistort(&PixelPoint::new(u, v), &camera, DEFAULT_MAX_ITERATIONS);
            let point = outcome.point().expect("ideal camera must converge");
            assert!((point.x - u).abs() < 1e-9);
            assert!((point.y - v).abs() < 1e-9);
            assert_eq!(outcome.summary().num_successful_steps(), 0);
        }
    }

    #[test]
    fn principal_point_is_fixed() {
        let camera = camera();
        let outcome = undistort(
            &PixelPoint::new(965.222, 666.6185),
            &camera,
            DEFAULT_MAX_ITERATIONS,
        );
        assert_eq!(outcome.point(), Some(PixelPoint::new(965.222, 666.6185)));
        assert!(outcome.summary().iterations.is_empty());
    }

    #[test]
    fn inverts_forward_model() {
        let camera = camera();

        for &(u, v) in &[
            (10.0, 10.0),
            (1900.0, 20.0),
            (1850.5, 1060.25),
            (35.0, 1000.0),
            (700.0, 300.0),
            (1200.0, 900.0),
        ] {
            let truth = PixelPoint::new(u, v);
            let distorted = predict_distorted(&truth, &camera);
            let outcome = undistort(&distorted, &camera, DEFAULT_MAX_ITERATIONS);

            let point = outcome.point().expect("round trip must converge");
            assert!((point.x - truth.x).abs() < 1e-6, "{point} vs {truth}");
            assert!((point.y - truth.y).abs() < 1e-6, "{point} vs {truth}");
        }
    }

    #[test]
    fn deterministic() {
        let camera = camera();
        let observed = PixelPoint::new(1919.0, 0.0);

        let first = undistort(&observed, &camera, DEFAULT_MAX_ITERATIONS);
        let second = undistort(&observed, &camera, DEFAULT_MAX_ITERATIONS);
        assert_eq!(first, second);
    }

    #[test]
    fn iteration_cap_yields_failure() {
        let camera = camera();
        let observed = PixelPoint::new(0.0, 0.0);

        let outcome = undistort(&observed, &camera, 1);
        assert!(!outcome.is_converged());
        assert_eq!(outcome.point(), None);
        assert_eq!(outcome.summary().termination_type(), TerminationType::NoConvergence);

        match &outcome {
            SolveOutcome::Failed {
                reason,
                last_estimate,
                ..
            } => {
                assert_eq!(*reason, SolveError::MaxIterations(1));
                assert_eq!(outcome.estimate(), *last_estimate);
                // one step already moved the estimate outward from the seed
                assert!(last_estimate.x < 0.0);
                assert!(last_estimate.y < 0.0);
            }
            SolveOutcome::Converged { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn into_result_maps_failure() {
        let camera = camera();

        let ok = undistort(&PixelPoint::new(100.0, 100.0), &camera, DEFAULT_MAX_ITERATIONS);
        assert!(ok.into_result().is_ok());

        let err = undistort(&PixelPoint::new(0.0, 0.0), &camera, 1)
            .into_result()
            .unwrap_err();
        assert!(matches!(err, RupError::Solve(SolveError::MaxIterations(1))));
    }

    #[test]
    fn parallel_matches_sequential() {
        let undistorter = PointUndistorter::new(camera());
        let points: Vec<PixelPoint> = (0..32)
            .map(|i| PixelPoint::new(60.0 * i as f64, 33.0 * i as f64))
            .collect();

        let parallel = undistorter.undistort_all(&points);
        let sequential: Vec<SolveOutcome> =
            points.iter().map(|p| undistorter.undistort(p)).collect();

        assert_eq!(parallel.len(), points.len());
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn residual_vanishes_at_solution() {
        let camera = camera();
        let outcome = undistort(&PixelPoint::new(1919.0, 1079.0), &camera, DEFAULT_MAX_ITERATIONS);
        let point = outcome.point().unwrap();

        let reprojected = predict_distorted(&point, &camera);
        assert!((reprojected.x - 1919.0).abs() < 1e-6);
        assert!((reprojected.y - 1079.0).abs() < 1e-6);
        assert!(outcome.summary().final_cost < 1e-12);
    }
}
