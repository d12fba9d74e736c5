use nalgebra::{Matrix2, Vector2};

use super::summary::{ConvergenceCriterion, IterationSummary, SolveSummary, Termination};
use super::{LeastSquaresProblem, SolverOptions};
use crate::error::SolveError;

/// Levenberg-Marquardt in trust-region form.
///
/// Each iteration solves `(J^T J + D / radius) step = -J^T r` with `D` the
/// clamped diagonal of `J^T J`, then accepts or rejects the step by comparing
/// the actual cost decrease with the decrease predicted by the linearization.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    options: SolverOptions,
}

impl LevenbergMarquardt {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Minimize `0.5 * |r(x)|^2` starting from `x0`.
    ///
    /// Returns the last accepted estimate together with the solve summary;
    /// the estimate is meaningful even when the solve failed.
    pub fn minimize<P: LeastSquaresProblem>(
        &self,
        problem: &P,
        x0: Vector2<f64>,
    ) -> (Vector2<f64>, SolveSummary) {
        let opts = &self.options;

        let mut x = x0;
        let (residual, mut jacobian) = problem.evaluate(&x);
        let mut cost = 0.5 * residual.norm_squared();

        let mut summary = SolveSummary {
            termination: Termination::Failed(SolveError::MaxIterations(opts.max_iterations)),
            initial_cost: cost,
            final_cost: cost,
            iterations: Vec::new(),
        };

        if !is_finite(cost, &jacobian) {
            summary.termination = Termination::Failed(SolveError::NonFinite);
            return (x, summary);
        }

        let mut gradient = jacobian.transpose() * residual;
        if gradient.amax() <= opts.gradient_tolerance {
            summary.termination = Termination::Converged(ConvergenceCriterion::GradientTolerance);
            return (x, summary);
        }

        let mut radius = opts.initial_trust_region_radius;
        let mut decrease_factor = 2.0;
        let mut has_succeeded = false;

        for iteration in 1..=opts.max_iterations {
            let hessian = jacobian.transpose() * jacobian;
            let diagonal = hessian
                .diagonal()
                .map(|d| d.clamp(opts.min_lm_diagonal, opts.max_lm_diagonal));
            let lhs = hessian + Matrix2::from_diagonal(&(diagonal / radius));

            let step = lhs.cholesky().map(|c| c.solve(&-gradient));

            let mut record = IterationSummary {
                iteration,
                cost,
                cost_change: 0.0,
                gradient_max_norm: gradient.amax(),
                step_norm: 0.0,
                relative_decrease: 0.0,
                trust_region_radius: radius,
                step_is_successful: false,
            };

            let accepted = match step {
                Some(step) => {
                    let step_norm = step.norm();
                    record.step_norm = step_norm;

                    let candidate = x + step;
                    let (candidate_residual, candidate_jacobian) = problem.evaluate(&candidate);
                    let candidate_cost = 0.5 * candidate_residual.norm_squared();
                    let finite = is_finite(candidate_cost, &candidate_jacobian);

                    let model_decrease =
                        -(gradient.dot(&step) + 0.5 * step.dot(&(hessian * step)));
                    let relative_decrease = if finite && model_decrease > 0.0 {
                        (cost - candidate_cost) / model_decrease
                    } else {
                        f64::NEG_INFINITY
                    };
                    record.relative_decrease = relative_decrease;

                    if step_norm <= opts.parameter_tolerance * (x.norm() + opts.parameter_tolerance)
                    {
                        // A tiny step only counts as convergence once the solve has made
                        // progress; before that it is rejected like any other bad step.
                        let improves = finite
                            && candidate_cost <= cost
                            && (candidate_cost < cost || has_succeeded);
                        if improves {
                            record.cost_change = cost - candidate_cost;
                            record.cost = candidate_cost;
                            record.step_is_successful = true;
                            x = candidate;
                            cost = candidate_cost;
                        }
                        if improves || has_succeeded {
                            summary.iterations.push(record);
                            summary.final_cost = cost;
                            summary.termination =
                                Termination::Converged(ConvergenceCriterion::ParameterTolerance);
                            return (x, summary);
                        }
                        None
                    } else if relative_decrease > opts.min_relative_decrease {
                        Some((
                            candidate,
                            candidate_cost,
                            candidate_jacobian,
                            candidate_jacobian.transpose() * candidate_residual,
                            relative_decrease,
                        ))
                    } else {
                        None
                    }
                }
                None => None,
            };

            match accepted {
                Some((candidate, candidate_cost, candidate_jacobian, candidate_gradient, rho)) => {
                    let previous_cost = cost;
                    let cost_change = previous_cost - candidate_cost;

                    x = candidate;
                    cost = candidate_cost;
                    jacobian = candidate_jacobian;
                    gradient = candidate_gradient;

                    let scale = (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
                    radius = (radius / scale).min(opts.max_trust_region_radius);
                    decrease_factor = 2.0;
                    has_succeeded = true;

                    record.cost = cost;
                    record.cost_change = cost_change;
                    record.step_is_successful = true;
                    summary.iterations.push(record);
                    summary.final_cost = cost;

                    if cost_change <= opts.function_tolerance * previous_cost {
                        summary.termination =
                            Termination::Converged(ConvergenceCriterion::FunctionTolerance);
                        return (x, summary);
                    }
                    if gradient.amax() <= opts.gradient_tolerance {
                        summary.termination =
                            Termination::Converged(ConvergenceCriterion::GradientTolerance);
                        return (x, summary);
                    }
                }
                None => {
                    radius /= decrease_factor;
                    decrease_factor *= 2.0;
                    summary.iterations.push(record);

                    if radius < opts.min_trust_region_radius {
                        summary.termination =
                            Termination::Failed(SolveError::NoImprovement(radius));
                        return (x, summary);
                    }
                }
            }
        }

        (x, summary)
    }
}

fn is_finite(cost: f64, jacobian: &Matrix2<f64>) -> bool {
    cost.is_finite() && jacobian.iter().all(|v| v.is_finite())
}
