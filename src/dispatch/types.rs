//! Solver capability: the contract between the dispatch evaluator and any
//! continuous solver.

use crate::system::CostCurve;

/// One continuous economic-dispatch instance.
///
/// Minimize `Σ curves[i](p[i])` subject to `lower[i] ≤ p[i] ≤ upper[i]`
/// and `Σ p[i] = demand`.
#[derive(Debug, Clone)]
pub struct DispatchProblem<'a> {
    /// Cost curve of each variable.
    pub curves: Vec<&'a CostCurve>,
    /// Lower bound of each variable.
    pub lower: Vec<f64>,
    /// Upper bound of each variable.
    pub upper: Vec<f64>,
    /// Right-hand side of the balance constraint.
    pub demand: f64,
}

impl DispatchProblem<'_> {
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Objective value at `powers`.
    pub fn objective(&self, powers: &[f64]) -> f64 {
        self.curves
            .iter()
            .zip(powers)
            .map(|(curve, &p)| curve.cost(p))
            .sum()
    }

    /// Sum of lower bounds.
    pub fn min_power(&self) -> f64 {
        self.lower.iter().sum()
    }

    /// Sum of upper bounds.
    pub fn max_power(&self) -> f64 {
        self.upper.iter().sum()
    }
}

/// Optimal point reported by a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSolution {
    /// Value of each variable.
    pub powers: Vec<f64>,
    /// Multiplier of the balance constraint (system incremental cost),
    /// when the solver computes one.
    pub multiplier: Option<f64>,
    /// Iterations the solver used.
    pub iterations: usize,
}

/// Reasons a solver returns no optimum.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverFailure {
    /// No point satisfies the bounds and the balance constraint.
    Infeasible,
    /// The solver stopped before reaching its tolerance.
    NotConverged { iterations: usize, residual: f64 },
}

/// A continuous solver for [`DispatchProblem`]s.
///
/// Implementations must keep all working state local to each call so that
/// one instance can serve many concurrent evaluations.
pub trait DispatchSolver: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Minimizes the problem or reports why it could not.
    fn minimize(&self, problem: &DispatchProblem<'_>) -> Result<SolverSolution, SolverFailure>;
}
