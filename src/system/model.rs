//! System model: a set of units that jointly serve one demand.

use super::types::{Unit, Zone};
use crate::dispatch::{DispatchEvaluator, DispatchResult};
use crate::error::{ConfigError, Error, Result};
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// A zone assignment: one 0-based zone index per unit, in unit order.
///
/// Operations are only built through [`PowerSystem::sample_operation`] and
/// [`PowerSystem::get_operation`], so every index is valid for the system
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Operation {
    zones: Vec<usize>,
}

impl Operation {
    pub(crate) fn from_indices(zones: Vec<usize>) -> Self {
        Self { zones }
    }

    /// Zone index chosen for each unit.
    pub fn zones(&self) -> &[usize] {
        &self.zones
    }

    /// Zone index chosen for the unit at position `unit`.
    pub fn zone(&self, unit: usize) -> Option<usize> {
        self.zones.get(unit).copied()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Comma-separated 1-based zone numbers, e.g. `1,3,2`.
impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, z) in self.zones.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", z + 1)?;
        }
        Ok(())
    }
}

/// A power system: ordered generation units plus the total demand.
///
/// # Examples
///
/// ```
/// use u_acopower::system::{CostCurve, PowerSystem, Unit, Zone};
///
/// let units = vec![
///     Unit::new("A", vec![Zone::new(1, 0.0, 100.0, CostCurve::quadratic(0.0, 1.0, 0.01))]).unwrap(),
///     Unit::new("B", vec![Zone::new(1, 0.0, 100.0, CostCurve::quadratic(0.0, 1.0, 0.02))]).unwrap(),
/// ];
/// let system = PowerSystem::new("demo", units, 120.0).unwrap();
/// let op = system.get_operation(&[0, 0]).unwrap();
/// let result = system.solve(&op).unwrap();
/// assert!((result.total_power() - 120.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PowerSystem {
    name: String,
    units: Vec<Unit>,
    demand: f64,
}

impl PowerSystem {
    /// Builds and validates a system.
    ///
    /// Fails when the demand is not positive, there are no units, or the
    /// combined maximum output of all units cannot reach the demand.
    pub fn new(
        name: impl Into<String>,
        units: Vec<Unit>,
        demand: f64,
    ) -> std::result::Result<Self, ConfigError> {
        let name = name.into();
        let invalid = |reason: String| ConfigError::InvalidSystem {
            system: name.clone(),
            reason,
        };

        if !(demand.is_finite() && demand > 0.0) {
            return Err(invalid(format!("demand must be positive, got {demand}")));
        }
        if units.is_empty() {
            return Err(invalid("system has no units".into()));
        }
        for (i, unit) in units.iter().enumerate() {
            if units[..i].iter().any(|u| u.id() == unit.id()) {
                return Err(invalid(format!("duplicate unit id '{}'", unit.id())));
            }
        }
        let capacity: f64 = units.iter().map(Unit::max_power).sum();
        if capacity < demand {
            return Err(invalid(format!(
                "total capacity {capacity} MW is below demand {demand} MW"
            )));
        }

        Ok(Self {
            name,
            units,
            demand,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    /// Zone count of every unit, in unit order.
    pub fn zone_counts(&self) -> Vec<usize> {
        self.units.iter().map(Unit::zone_count).collect()
    }

    /// Draws one zone per unit uniformly at random.
    pub fn sample_operation<R: Rng>(&self, rng: &mut R) -> Operation {
        let zones = self
            .units
            .iter()
            .map(|u| rng.random_range(0..u.zone_count()))
            .collect();
        Operation::from_indices(zones)
    }

    /// Builds an operation from explicit 0-based zone indices.
    ///
    /// The sequence must have one entry per unit and each entry must be
    /// below that unit's zone count.
    pub fn get_operation(&self, zones: &[usize]) -> Result<Operation> {
        if zones.len() != self.units.len() {
            return Err(Error::InvalidZoneAssignment {
                reason: format!(
                    "expected {} zone indices, got {}",
                    self.units.len(),
                    zones.len()
                ),
            });
        }
        for (unit, &zone) in self.units.iter().zip(zones) {
            if zone >= unit.zone_count() {
                return Err(Error::InvalidZoneAssignment {
                    reason: format!(
                        "unit '{}' has {} zones, index {} is out of range",
                        unit.id(),
                        unit.zone_count(),
                        zone
                    ),
                });
            }
        }
        Ok(Operation::from_indices(zones.to_vec()))
    }

    /// Selected zone of every unit, paired with the unit.
    ///
    /// Fails with [`Error::InvalidZoneAssignment`] when `operation` does
    /// not fit this system's zone layout.
    pub fn selected_zones<'a>(
        &'a self,
        operation: &'a Operation,
    ) -> Result<impl Iterator<Item = (&'a Unit, &'a Zone)> + 'a> {
        self.get_operation(operation.zones())?;
        Ok(self
            .units
            .iter()
            .zip(operation.zones())
            .filter_map(|(u, &z)| u.zone(z).map(|zone| (u, zone))))
    }

    /// Solves the economic dispatch of `operation` with the default solver.
    pub fn solve(&self, operation: &Operation) -> Result<DispatchResult> {
        DispatchEvaluator::default().evaluate(self, operation)
    }

    /// Solves the economic dispatch of `operation` with a given evaluator.
    pub fn solve_with(
        &self,
        evaluator: &DispatchEvaluator,
        operation: &Operation,
    ) -> Result<DispatchResult> {
        evaluator.evaluate(self, operation)
    }
}
