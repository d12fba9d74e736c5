use std::fmt;

use crate::error::SolveError;

/// Coarse classification of how a solve ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationType {
    Convergence,
    NoConvergence,
    Failure,
}

impl fmt::Display for TerminationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationType::Convergence => "CONVERGENCE",
            TerminationType::NoConvergence => "NO_CONVERGENCE",
            TerminationType::Failure => "FAILURE",
        };
        f.write_str(name)
    }
}

/// Which tolerance stopped a converged solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceCriterion {
    FunctionTolerance,
    GradientTolerance,
    ParameterTolerance,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    Converged(ConvergenceCriterion),
    Failed(SolveError),
}

impl Termination {
    pub fn termination_type(&self) -> TerminationType {
        match self {
            Termination::Converged(_) => TerminationType::Convergence,
            Termination::Failed(SolveError::MaxIterations(_)) => TerminationType::NoConvergence,
            Termination::Failed(_) => TerminationType::Failure,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Converged(ConvergenceCriterion::FunctionTolerance) => {
                f.write_str("Function tolerance reached")
            }
            Termination::Converged(ConvergenceCriterion::GradientTolerance) => {
                f.write_str("Gradient tolerance reached")
            }
            Termination::Converged(ConvergenceCriterion::ParameterTolerance) => {
                f.write_str("Parameter tolerance reached")
            }
            Termination::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// One attempted step
#[derive(Debug, Clone, PartialEq)]
pub struct IterationSummary {
    pub iteration: usize,
    /// Cost after the iteration (unchanged when the step was rejected)
    pub cost: f64,
    pub cost_change: f64,
    pub gradient_max_norm: f64,
    pub step_norm: f64,
    /// Actual over predicted cost decrease
    pub relative_decrease: f64,
    pub trust_region_radius: f64,
    pub step_is_successful: bool,
}

/// Record of a single solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolveSummary {
    pub termination: Termination,
    /// Half the squared residual norm at the seed
    pub initial_cost: f64,
    pub final_cost: f64,
    pub iterations: Vec<IterationSummary>,
}

impl SolveSummary {
    pub fn termination_type(&self) -> TerminationType {
        self.termination.termination_type()
    }

    pub fn is_converged(&self) -> bool {
        self.termination_type() == TerminationType::Convergence
    }

    pub fn num_successful_steps(&self) -> usize {
        self.iterations.iter().filter(|it| it.step_is_successful).count()
    }

    pub fn num_unsuccessful_steps(&self) -> usize {
        self.iterations.len() - self.num_successful_steps()
    }

    /// One-line report
    pub fn brief_report(&self) -> String {
        format!(
            "Iterations: {}, Initial cost: {:e}, Final cost: {:e}, Termination: {} ({})",
            self.iterations.len(),
            self.initial_cost,
            self.final_cost,
            self.termination_type(),
            self.termination
        )
    }
}
