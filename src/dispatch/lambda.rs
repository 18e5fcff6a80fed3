//! Equal-incremental-cost (lambda iteration) dispatch solver.
//!
//! At the optimum of a convex dispatch every unit strictly inside its
//! bounds runs at the same incremental cost λ. The solver bisects on λ:
//! for a trial λ each unit's output is the power where its incremental
//! cost equals λ, clamped to its bounds, and the total output is
//! monotone in λ. Once the bracket collapses, the outputs at both ends are
//! blended so that the balance constraint holds exactly.
//!
//! For non-convex curves the result is a stationary point, not
//! necessarily the global optimum.
//!
//! # References
//!
//! Wood & Wollenberg (2013), *Power Generation, Operation, and Control*, ch. 3

use super::types::{DispatchProblem, DispatchSolver, SolverFailure, SolverSolution};
use crate::system::CostCurve;

/// Parameters of [`LambdaIteration`].
///
/// # Examples
///
/// ```
/// use u_acopower::dispatch::LambdaConfig;
///
/// let config = LambdaConfig::default()
///     .with_max_iterations(500)
///     .with_tolerance(1e-9);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    /// Maximum bisection steps on λ.
    pub max_iterations: usize,

    /// Allowed mismatch between total output and demand (MW).
    pub tolerance: f64,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-7,
        }
    }
}

impl LambdaConfig {
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".into());
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(format!("tolerance must be positive, got {}", self.tolerance));
        }
        Ok(())
    }
}

/// Bisection on the system incremental cost.
#[derive(Debug, Clone, Default)]
pub struct LambdaIteration {
    config: LambdaConfig,
}

impl LambdaIteration {
    pub fn new(config: LambdaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LambdaConfig {
        &self.config
    }
}

impl DispatchSolver for LambdaIteration {
    fn name(&self) -> &str {
        "lambda-iteration"
    }

    fn minimize(&self, problem: &DispatchProblem<'_>) -> Result<SolverSolution, SolverFailure> {
        let tol = self.config.tolerance;
        let demand = problem.demand;
        let min_power = problem.min_power();
        let max_power = problem.max_power();

        if demand > max_power + tol || demand < min_power - tol {
            return Err(SolverFailure::Infeasible);
        }
        if demand >= max_power - tol {
            return Ok(SolverSolution {
                powers: problem.upper.clone(),
                multiplier: None,
                iterations: 0,
            });
        }
        if demand <= min_power + tol {
            return Ok(SolverSolution {
                powers: problem.lower.clone(),
                multiplier: None,
                iterations: 0,
            });
        }

        // Bracket λ between the smallest and largest incremental cost found
        // at any bound. At the low end every unit sits at its lower bound,
        // at the high end at its upper bound.
        let (mut lambda_lo, mut lambda_hi) = marginal_range(problem);
        if !(lambda_lo.is_finite() && lambda_hi.is_finite()) {
            return Err(SolverFailure::NotConverged {
                iterations: 0,
                residual: f64::INFINITY,
            });
        }
        let mut powers_lo = problem.lower.clone();
        let mut powers_hi = problem.upper.clone();
        let mut total_lo = min_power;
        let mut total_hi = max_power;
        let mut residual = f64::INFINITY;

        for iteration in 1..=self.config.max_iterations {
            let lambda = 0.5 * (lambda_lo + lambda_hi);
            let powers: Vec<f64> = problem
                .curves
                .iter()
                .zip(problem.lower.iter().zip(&problem.upper))
                .map(|(curve, (&lo, &hi))| unit_output(curve, lo, hi, lambda))
                .collect();
            let total: f64 = powers.iter().sum();
            if !total.is_finite() {
                return Err(SolverFailure::NotConverged {
                    iterations: iteration,
                    residual: f64::INFINITY,
                });
            }

            residual = (total - demand).abs();
            if residual <= tol {
                return Ok(SolverSolution {
                    powers,
                    multiplier: Some(lambda),
                    iterations: iteration,
                });
            }

            if total < demand {
                lambda_lo = lambda;
                powers_lo = powers;
                total_lo = total;
            } else {
                lambda_hi = lambda;
                powers_hi = powers;
                total_hi = total;
            }

            if lambda_hi - lambda_lo <= f64::EPSILON * lambda_hi.abs().max(1.0) {
                let powers = blend(&powers_lo, &powers_hi, total_lo, total_hi, demand);
                return Ok(SolverSolution {
                    powers,
                    multiplier: Some(0.5 * (lambda_lo + lambda_hi)),
                    iterations: iteration,
                });
            }
        }

        Err(SolverFailure::NotConverged {
            iterations: self.config.max_iterations,
            residual,
        })
    }
}

/// Smallest and largest incremental cost over all bounds.
fn marginal_range(problem: &DispatchProblem<'_>) -> (f64, f64) {
    problem
        .curves
        .iter()
        .zip(problem.lower.iter().zip(&problem.upper))
        .flat_map(|(curve, (&lo, &hi))| [curve.marginal_cost(lo), curve.marginal_cost(hi)])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), m| {
            (min.min(m), max.max(m))
        })
}

/// Output of one unit at incremental cost `lambda`, clamped to `[lo, hi]`.
fn unit_output(curve: &CostCurve, lo: f64, hi: f64, lambda: f64) -> f64 {
    if curve.marginal_cost(lo) >= lambda {
        return lo;
    }
    if curve.marginal_cost(hi) <= lambda {
        return hi;
    }

    let k = curve.coefficients();
    if curve.degree() == 2 && k[2] > 0.0 {
        return ((lambda - k[1]) / (2.0 * k[2])).clamp(lo, hi);
    }

    // Incremental cost crosses lambda inside (lo, hi).
    let (mut a, mut b) = (lo, hi);
    for _ in 0..100 {
        let mid = 0.5 * (a + b);
        if curve.marginal_cost(mid) < lambda {
            a = mid;
        } else {
            b = mid;
        }
        if b - a <= f64::EPSILON * b.abs().max(1.0) {
            break;
        }
    }
    0.5 * (a + b)
}

/// Convex combination of two bracketing dispatches that sums to `demand`.
fn blend(lo: &[f64], hi: &[f64], total_lo: f64, total_hi: f64, demand: f64) -> Vec<f64> {
    let span = total_hi - total_lo;
    let theta = if span > 0.0 {
        ((demand - total_lo) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    lo.iter()
        .zip(hi)
        .map(|(&a, &b)| a + theta * (b - a))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(curves: &[CostCurve], bounds: &[(f64, f64)], demand: f64) -> Result<SolverSolution, SolverFailure> {
        let problem = DispatchProblem {
            curves: curves.iter().collect(),
            lower: bounds.iter().map(|b| b.0).collect(),
            upper: bounds.iter().map(|b| b.1).collect(),
            demand,
        };
        LambdaIteration::default().minimize(&problem)
    }

    #[test]
    fn test_two_quadratic_units_equal_marginal() {
        // C1 = P + 0.01 P^2, C2 = P + 0.02 P^2, demand 120.
        // 1 + 0.02 P1 = 1 + 0.04 P2, P1 + P2 = 120 -> P1 = 80, P2 = 40.
        let curves = [
            CostCurve::quadratic(0.0, 1.0, 0.01),
            CostCurve::quadratic(0.0, 1.0, 0.02),
        ];
        let sol = solve(&curves, &[(0.0, 100.0), (0.0, 100.0)], 120.0).unwrap();

        assert!((sol.powers[0] - 80.0).abs() < 1e-5, "{:?}", sol.powers);
        assert!((sol.powers[1] - 40.0).abs() < 1e-5, "{:?}", sol.powers);
        let lambda = sol.multiplier.unwrap();
        assert!((lambda - 2.6).abs() < 1e-6);
    }

    #[test]
    fn test_bound_active_unit() {
        // Cheap unit saturates at its upper bound.
        let curves = [
            CostCurve::quadratic(0.0, 1.0, 0.001),
            CostCurve::quadratic(0.0, 5.0, 0.01),
        ];
        let sol = solve(&curves, &[(0.0, 50.0), (0.0, 200.0)], 100.0).unwrap();
        assert!((sol.powers[0] - 50.0).abs() < 1e-6);
        assert!((sol.powers[1] - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_costs_fill_in_merit_order() {
        let curves = [
            CostCurve::new(vec![0.0, 3.0]),
            CostCurve::new(vec![0.0, 1.0]),
            CostCurve::new(vec![0.0, 2.0]),
        ];
        let sol = solve(&curves, &[(0.0, 40.0), (0.0, 40.0), (0.0, 40.0)], 60.0).unwrap();
        let total: f64 = sol.powers.iter().sum();
        assert!((total - 60.0).abs() < 1e-6);
        assert!((sol.powers[1] - 40.0).abs() < 1e-6);
        assert!((sol.powers[2] - 20.0).abs() < 1e-6);
        assert!(sol.powers[0].abs() < 1e-6);
    }

    #[test]
    fn test_cubic_curve_uses_inner_bisection() {
        let curves = [
            CostCurve::new(vec![0.0, 1.0, 0.0, 0.0001]),
            CostCurve::new(vec![0.0, 1.0, 0.0, 0.0001]),
        ];
        let sol = solve(&curves, &[(0.0, 100.0), (0.0, 100.0)], 100.0).unwrap();
        // Identical units split evenly.
        assert!((sol.powers[0] - 50.0).abs() < 1e-4);
        assert!((sol.powers[1] - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_infeasible_above_capacity() {
        let curves = [CostCurve::quadratic(0.0, 1.0, 0.01)];
        let err = solve(&curves, &[(0.0, 100.0)], 150.0).unwrap_err();
        assert_eq!(err, SolverFailure::Infeasible);
    }

    #[test]
    fn test_infeasible_below_minimum() {
        let curves = [CostCurve::quadratic(0.0, 1.0, 0.01)];
        let err = solve(&curves, &[(60.0, 100.0)], 30.0).unwrap_err();
        assert_eq!(err, SolverFailure::Infeasible);
    }

    #[test]
    fn test_demand_at_capacity() {
        let curves = [CostCurve::quadratic(0.0, 1.0, 0.01)];
        let sol = solve(&curves, &[(0.0, 100.0)], 100.0).unwrap();
        assert_eq!(sol.powers, vec![100.0]);
    }

    #[test]
    fn test_iteration_limit_reports_not_converged() {
        let curves = [
            CostCurve::quadratic(0.0, 1.0, 0.01),
            CostCurve::quadratic(0.0, 1.0, 0.02),
        ];
        let problem = DispatchProblem {
            curves: curves.iter().collect(),
            lower: vec![0.0, 0.0],
            upper: vec![100.0, 100.0],
            demand: 123.456,
        };
        let solver = LambdaIteration::new(LambdaConfig::default().with_max_iterations(1));
        let err = solver.minimize(&problem).unwrap_err();
        assert!(matches!(err, SolverFailure::NotConverged { iterations: 1, .. }));
    }

    #[test]
    fn test_config_validate() {
        assert!(LambdaConfig::default().validate().is_ok());
        assert!(LambdaConfig::default().with_max_iterations(0).validate().is_err());
        assert!(LambdaConfig::default().with_tolerance(0.0).validate().is_err());
    }
}
