//! Dispatch evaluator: turns an [`Operation`] into a solved dispatch.

use super::lambda::LambdaIteration;
use super::types::{DispatchProblem, DispatchSolver, SolverFailure};
use crate::error::{Error, Result};
use crate::system::{Operation, PowerSystem};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of one economic dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    /// Total generation cost.
    pub total_cost: f64,
    /// Whether the allocation passed the bound and balance checks.
    pub feasible: bool,
    /// Power of each unit, in unit order.
    pub powers: Vec<f64>,
    /// System incremental cost, when the solver reports it.
    pub lambda: Option<f64>,
    /// Iterations the solver used.
    pub iterations: usize,
}

impl DispatchResult {
    /// Sum of all unit outputs.
    pub fn total_power(&self) -> f64 {
        self.powers.iter().sum()
    }
}

/// Builds and solves the dispatch problem for a given zone assignment.
///
/// The evaluator is cheap to clone and holds no per-call state, so one
/// instance can be shared across threads.
///
/// # Examples
///
/// ```
/// use u_acopower::dispatch::{DispatchEvaluator, LambdaConfig, LambdaIteration};
///
/// let evaluator = DispatchEvaluator::new(LambdaIteration::new(
///     LambdaConfig::default().with_tolerance(1e-9),
/// ))
/// .with_tolerance(1e-6);
/// assert_eq!(evaluator.solver_name(), "lambda-iteration");
/// ```
#[derive(Clone)]
pub struct DispatchEvaluator {
    solver: Arc<dyn DispatchSolver>,
    tolerance: f64,
}

impl Default for DispatchEvaluator {
    fn default() -> Self {
        Self::new(LambdaIteration::default())
    }
}

impl fmt::Debug for DispatchEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEvaluator")
            .field("solver", &self.solver.name())
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl DispatchEvaluator {
    pub fn new<S: DispatchSolver + 'static>(solver: S) -> Self {
        Self::from_arc(Arc::new(solver))
    }

    pub fn from_arc(solver: Arc<dyn DispatchSolver>) -> Self {
        Self {
            solver,
            tolerance: 1e-6,
        }
    }

    /// Sets the relative tolerance used to accept a solver's point.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Solves the economic dispatch of `operation` on `system`.
    ///
    /// Returns [`Error::Infeasible`] when the selected zones cannot meet
    /// the demand and [`Error::SolverNumericalFailure`] when the solver
    /// gives up or returns a point that violates the constraints.
    pub fn evaluate(&self, system: &PowerSystem, operation: &Operation) -> Result<DispatchResult> {
        let mut problem = DispatchProblem {
            curves: Vec::with_capacity(system.unit_count()),
            lower: Vec::with_capacity(system.unit_count()),
            upper: Vec::with_capacity(system.unit_count()),
            demand: system.demand(),
        };
        // Operations from another system may not fit this one.
        for (_, zone) in system.selected_zones(operation)? {
            problem.curves.push(&zone.cost);
            problem.lower.push(zone.p_min);
            problem.upper.push(zone.p_max);
        }

        let demand = problem.demand;
        let eps = self.tolerance * demand.abs().max(1.0);
        let infeasible = || Error::Infeasible {
            demand,
            min_power: problem.min_power(),
            max_power: problem.max_power(),
        };

        if problem.max_power() < demand - eps || problem.min_power() > demand + eps {
            debug!(%operation, "selected zones cannot meet demand");
            return Err(infeasible());
        }

        let solution = match self.solver.minimize(&problem) {
            Ok(solution) => solution,
            Err(SolverFailure::Infeasible) => {
                debug!(%operation, solver = self.solver.name(), "solver reported infeasible");
                return Err(infeasible());
            }
            Err(SolverFailure::NotConverged {
                iterations,
                residual,
            }) => {
                debug!(
                    %operation,
                    solver = self.solver.name(),
                    iterations,
                    residual,
                    "solver did not converge"
                );
                return Err(Error::SolverNumericalFailure {
                    iterations,
                    residual,
                });
            }
        };

        let numerical_failure = |residual: f64| Error::SolverNumericalFailure {
            iterations: solution.iterations,
            residual,
        };
        if solution.powers.len() != problem.len() {
            return Err(numerical_failure(f64::INFINITY));
        }

        // Pull points that sit within tolerance of a bound back inside it.
        let mut powers = Vec::with_capacity(problem.len());
        for ((&p, &lo), &hi) in solution
            .powers
            .iter()
            .zip(&problem.lower)
            .zip(&problem.upper)
        {
            if !p.is_finite() || p < lo - eps || p > hi + eps {
                return Err(numerical_failure(f64::INFINITY));
            }
            powers.push(p.clamp(lo, hi));
        }

        let total: f64 = powers.iter().sum();
        if total < demand - eps {
            return Err(numerical_failure(demand - total));
        }

        let total_cost = problem.objective(&powers);
        if !total_cost.is_finite() {
            return Err(numerical_failure(f64::INFINITY));
        }
        trace!(%operation, total_cost, "dispatch solved");

        Ok(DispatchResult {
            total_cost,
            feasible: true,
            powers,
            lambda: solution.multiplier,
            iterations: solution.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{LambdaConfig, SolverSolution};
    use crate::system::{CostCurve, Unit, Zone};

    fn single_zone(id: &str, p_min: f64, p_max: f64, curve: CostCurve) -> Unit {
        Unit::new(id, vec![Zone::new(1, p_min, p_max, curve)]).unwrap()
    }

    #[test]
    fn test_single_unit_exact_demand() {
        let curve = CostCurve::quadratic(100.0, 2.0, 0.01);
        let system =
            PowerSystem::new("one", vec![single_zone("A", 50.0, 150.0, curve.clone())], 150.0)
                .unwrap();
        let op = system.get_operation(&[0]).unwrap();
        let result = system.solve(&op).unwrap();

        assert!(result.feasible);
        assert!((result.powers[0] - 150.0).abs() < 1e-6);
        assert!((result.total_cost - curve.cost(150.0)).abs() < 1e-6);
    }

    #[test]
    fn test_two_units_lagrangian_split() {
        // Marginal costs 10 + 0.2 PA and 8 + 0.4 PB; PA + PB = 120.
        // 10 + 0.2 PA = 8 + 0.4 (120 - PA) -> PA = 76.667, PB = 43.333.
        let a = CostCurve::quadratic(50.0, 10.0, 0.1);
        let b = CostCurve::quadratic(40.0, 8.0, 0.2);
        let system = PowerSystem::new(
            "two",
            vec![
                single_zone("A", 0.0, 100.0, a.clone()),
                single_zone("B", 0.0, 100.0, b.clone()),
            ],
            120.0,
        )
        .unwrap();
        let op = system.get_operation(&[0, 0]).unwrap();
        let result = system.solve(&op).unwrap();

        let pa = 230.0 / 3.0;
        let pb = 120.0 - pa;
        let expected = a.cost(pa) + b.cost(pb);
        assert!(result.total_power() >= 120.0 - 1e-6);
        assert!((result.powers[0] - pa).abs() < 1e-4, "{:?}", result.powers);
        assert!((result.total_cost - expected).abs() < 1e-4);
        let lambda = result.lambda.unwrap();
        assert!((lambda - a.marginal_cost(pa)).abs() < 1e-5);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let curve = CostCurve::quadratic(10.0, 2.0, 0.003);
        let system = PowerSystem::new(
            "det",
            vec![
                single_zone("A", 10.0, 200.0, curve.clone()),
                single_zone("B", 20.0, 150.0, CostCurve::quadratic(5.0, 2.5, 0.002)),
                single_zone("C", 0.0, 100.0, curve),
            ],
            310.0,
        )
        .unwrap();
        let op = system.get_operation(&[0, 0, 0]).unwrap();
        let first = system.solve(&op).unwrap();
        let second = system.solve(&op).unwrap();
        assert!((first.total_cost - second.total_cost).abs() < 1e-9);
    }

    #[test]
    fn test_selected_zones_below_demand_are_infeasible() {
        let curve = CostCurve::quadratic(0.0, 1.0, 0.01);
        let units = vec![
            Unit::new(
                "A",
                vec![
                    Zone::new(1, 0.0, 30.0, curve.clone()),
                    Zone::new(2, 50.0, 100.0, curve.clone()),
                ],
            )
            .unwrap(),
            single_zone("B", 0.0, 60.0, curve),
        ];
        let system = PowerSystem::new("inf", units, 120.0).unwrap();

        let err = system.solve(&system.get_operation(&[0, 0]).unwrap()).unwrap_err();
        assert!(matches!(err, Error::Infeasible { max_power, .. } if (max_power - 90.0).abs() < 1e-12));
        assert!(system.solve(&system.get_operation(&[1, 0]).unwrap()).is_ok());
    }

    #[test]
    fn test_minimums_above_demand_are_infeasible() {
        let curve = CostCurve::quadratic(0.0, 1.0, 0.01);
        let system = PowerSystem::new(
            "min",
            vec![
                single_zone("A", 80.0, 100.0, curve.clone()),
                single_zone("B", 80.0, 100.0, curve),
            ],
            120.0,
        )
        .unwrap();
        let err = system.solve(&system.get_operation(&[0, 0]).unwrap()).unwrap_err();
        assert!(matches!(err, Error::Infeasible { .. }));
    }

    struct StalledSolver;

    impl DispatchSolver for StalledSolver {
        fn name(&self) -> &str {
            "stalled"
        }

        fn minimize(&self, _: &DispatchProblem<'_>) -> std::result::Result<SolverSolution, SolverFailure> {
            Err(SolverFailure::NotConverged {
                iterations: 7,
                residual: 3.0,
            })
        }
    }

    struct ShortSolver;

    impl DispatchSolver for ShortSolver {
        fn name(&self) -> &str {
            "short"
        }

        fn minimize(&self, problem: &DispatchProblem<'_>) -> std::result::Result<SolverSolution, SolverFailure> {
            Ok(SolverSolution {
                powers: problem.lower.clone(),
                multiplier: None,
                iterations: 1,
            })
        }
    }

    fn two_unit_system() -> PowerSystem {
        let curve = CostCurve::quadratic(0.0, 1.0, 0.01);
        PowerSystem::new(
            "two",
            vec![
                single_zone("A", 0.0, 100.0, curve.clone()),
                single_zone("B", 0.0, 100.0, curve),
            ],
            120.0,
        )
        .unwrap()
    }

    #[test]
    fn test_not_converged_maps_to_numerical_failure() {
        let system = two_unit_system();
        let evaluator = DispatchEvaluator::new(StalledSolver);
        let err = system
            .solve_with(&evaluator, &system.get_operation(&[0, 0]).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::SolverNumericalFailure { iterations: 7, .. }));
    }

    #[test]
    fn test_point_short_of_demand_is_rejected() {
        let system = two_unit_system();
        let evaluator = DispatchEvaluator::new(ShortSolver);
        let err = evaluator
            .evaluate(&system, &system.get_operation(&[0, 0]).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::SolverNumericalFailure { residual, .. } if (residual - 120.0).abs() < 1e-9));
    }

    #[test]
    fn test_operation_from_other_system_is_rejected() {
        let system = two_unit_system();
        let curve = CostCurve::quadratic(0.0, 1.0, 0.0);
        let other = PowerSystem::new("one", vec![single_zone("A", 0.0, 10.0, curve)], 5.0).unwrap();
        let op = other.get_operation(&[0]).unwrap();
        let err = system.solve(&op).unwrap_err();
        assert!(matches!(err, Error::InvalidZoneAssignment { .. }));
    }

    #[test]
    fn test_evaluator_shared_across_threads() {
        let system = two_unit_system();
        let evaluator = DispatchEvaluator::new(LambdaIteration::new(LambdaConfig::default()));
        let op = system.get_operation(&[0, 0]).unwrap();

        let costs: Vec<f64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| evaluator.evaluate(&system, &op).unwrap().total_cost))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for c in &costs {
            assert!((c - costs[0]).abs() < 1e-12);
        }
    }
}
