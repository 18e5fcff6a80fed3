//! Economic dispatch for a fixed zone assignment.
//!
//! For a given [`Operation`](crate::system::Operation) each unit is
//! confined to its selected zone and the total output must meet the system
//! demand. The remaining continuous problem is handed to a
//! [`DispatchSolver`], a narrow capability that can be swapped without
//! touching the colony search.
//!
//! # Key Types
//!
//! - [`DispatchEvaluator`]: Builds the problem and interprets the solver outcome
//! - [`DispatchSolver`]: Objective + bounds + balance constraint → optimum or failure
//! - [`LambdaIteration`]: Bundled equal-incremental-cost solver

mod evaluator;
mod lambda;
mod types;

pub use evaluator::{DispatchEvaluator, DispatchResult};
pub use lambda::{LambdaConfig, LambdaIteration};
pub use types::{DispatchProblem, DispatchSolver, SolverFailure, SolverSolution};
