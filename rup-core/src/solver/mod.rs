//! Small dense nonlinear least-squares solver for two unknowns

mod lm;
mod summary;

pub use lm::LevenbergMarquardt;
pub use summary::{
    ConvergenceCriterion, IterationSummary, SolveSummary, Termination, TerminationType,
};

use nalgebra::{Matrix2, Vector2};

/// Attempted steps allowed per solve unless overridden
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// A residual block with two outputs over two unknowns
pub trait LeastSquaresProblem {
    /// Residual vector and its Jacobian with respect to `x`
    fn evaluate(&self, x: &Vector2<f64>) -> (Vector2<f64>, Matrix2<f64>);
}

/// Solver tuning. The defaults are the conventional trust-region settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Attempted steps (accepted or rejected) before giving up.
    pub max_iterations: usize,
    /// Stop when |cost change| <= tolerance * cost. Default 1e-6.
    pub function_tolerance: f64,
    /// Stop when max |J^T r| <= tolerance. Default 1e-10.
    pub gradient_tolerance: f64,
    /// Stop when |step| <= tolerance * (|x| + tolerance). Default 1e-8.
    pub parameter_tolerance: f64,
    pub initial_trust_region_radius: f64,
    pub max_trust_region_radius: f64,
    /// Failing below this radius means no further improvement is possible.
    pub min_trust_region_radius: f64,
    /// Minimum ratio of actual to predicted cost decrease for a step to be accepted.
    pub min_relative_decrease: f64,
    /// Clamp range for the diagonal of J^T J used as LM scaling.
    pub min_lm_diagonal: f64,
    pub max_lm_diagonal: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            function_tolerance: 1e-6,
            gradient_tolerance: 1e-10,
            parameter_tolerance: 1e-8,
            initial_trust_region_radius: 1e4,
            max_trust_region_radius: 1e16,
            min_trust_region_radius: 1e-32,
            min_relative_decrease: 1e-3,
            min_lm_diagonal: 1e-6,
            max_lm_diagonal: 1e32,
        }
    }
}

impl SolverOptions {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}
