//! Error types.
//!
//! Only [`Error::Configuration`] and [`Error::InvalidZoneAssignment`] stop
//! the caller's current operation. [`Error::Infeasible`] and
//! [`Error::SolverNumericalFailure`] are per-evaluation conditions that the
//! colony absorbs as a sentinel cost.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or validating a system or colony definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The catalog file could not be read.
    #[error("failed to read system catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not valid JSON or does not have the expected shape.
    #[error("failed to parse system catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// No system with the requested name exists in the catalog.
    #[error("system '{0}' not found in catalog")]
    MissingSystem(String),

    /// A field of a system entry is missing or has the wrong type.
    #[error("system '{system}': {reason}")]
    Malformed { system: String, reason: String },

    /// A unit definition violates the unit invariants.
    #[error("unit '{unit}': {reason}")]
    InvalidUnit { unit: String, reason: String },

    /// The system as a whole violates the system invariants.
    #[error("system '{system}': {reason}")]
    InvalidSystem { system: String, reason: String },

    /// Colony parameters failed validation.
    #[error("invalid colony configuration: {0}")]
    InvalidColony(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// A caller-supplied zone sequence was rejected.
    #[error("invalid zone assignment: {reason}")]
    InvalidZoneAssignment { reason: String },

    /// No power allocation within the selected zones meets the demand.
    #[error("infeasible operation: zones cover [{min_power}, {max_power}] MW, demand is {demand} MW")]
    Infeasible {
        demand: f64,
        min_power: f64,
        max_power: f64,
    },

    /// The solver stopped without converging for a reason other than
    /// infeasibility.
    #[error("dispatch solver failed after {iterations} iterations (residual {residual:e})")]
    SolverNumericalFailure { iterations: usize, residual: f64 },
}

impl Error {
    /// Returns `true` for conditions a running search absorbs instead of
    /// propagating.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Infeasible { .. } | Error::SolverNumericalFailure { .. }
        )
    }
}
