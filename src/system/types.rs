//! Unit model: cost curves, operative zones and generation units.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Polynomial fuel-cost curve `C(P) = a + b·P + c·P² + …`.
///
/// Coefficients are stored in ascending power order, so a classic
/// quadratic curve is `[a, b, c]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCurve {
    coefficients: Vec<f64>,
}

impl CostCurve {
    /// Creates a curve from ascending-order coefficients.
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// Creates the quadratic curve `a + b·P + c·P²`.
    pub fn quadratic(a: f64, b: f64, c: f64) -> Self {
        Self::new(vec![a, b, c])
    }

    /// Coefficients in ascending power order.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Polynomial degree (0 for an empty or constant curve).
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluates the cost at `power` (Horner's rule).
    pub fn cost(&self, power: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &k| acc * power + k)
    }

    /// Evaluates the incremental cost `dC/dP` at `power`.
    pub fn marginal_cost(&self, power: f64) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (i, &k)| acc * power + i as f64 * k)
    }

    /// Lowest cost on `[lo, hi]`.
    ///
    /// Exact up to degree 2; higher degrees are sampled on a grid.
    fn min_cost_on(&self, lo: f64, hi: f64) -> f64 {
        const STEPS: usize = 64;
        let mut min = (0..=STEPS)
            .map(|i| self.cost(lo + (hi - lo) * i as f64 / STEPS as f64))
            .fold(f64::INFINITY, f64::min);
        if let [_, b, c] = self.coefficients[..] {
            if c != 0.0 {
                let vertex = -b / (2.0 * c);
                if vertex > lo && vertex < hi {
                    min = min.min(self.cost(vertex));
                }
            }
        }
        min
    }

    fn validate(&self) -> Result<(), String> {
        if self.coefficients.is_empty() {
            return Err("cost curve has no coefficients".into());
        }
        if self.coefficients.iter().any(|k| !k.is_finite()) {
            return Err("cost curve coefficients must be finite".into());
        }
        Ok(())
    }
}

/// One operative zone of a unit: a power range with its own cost curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// 1-based zone number, as written in system catalogs.
    pub number: usize,
    /// Minimum power output (MW).
    pub p_min: f64,
    /// Maximum power output (MW).
    pub p_max: f64,
    /// Cost curve valid inside `[p_min, p_max]`.
    pub cost: CostCurve,
}

impl Zone {
    pub fn new(number: usize, p_min: f64, p_max: f64, cost: CostCurve) -> Self {
        Self {
            number,
            p_min,
            p_max,
            cost,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !self.p_min.is_finite() || !self.p_max.is_finite() {
            return Err(format!("zone {}: power bounds must be finite", self.number));
        }
        if self.p_min < 0.0 {
            return Err(format!("zone {}: Pmin must be non-negative", self.number));
        }
        if self.p_min > self.p_max {
            return Err(format!(
                "zone {}: Pmin {} exceeds Pmax {}",
                self.number, self.p_min, self.p_max
            ));
        }
        self.cost
            .validate()
            .map_err(|e| format!("zone {}: {e}", self.number))?;
        if self.cost.min_cost_on(self.p_min, self.p_max) < 0.0 {
            return Err(format!(
                "zone {}: cost must be non-negative between Pmin and Pmax",
                self.number
            ));
        }
        Ok(())
    }
}

/// A thermal generation unit with one or more operative zones.
///
/// Zone ranges may be disjoint and unordered. Zones are kept sorted by
/// their number, and numbers must run `1..=k` without gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    id: String,
    zones: Vec<Zone>,
}

impl Unit {
    /// Builds and validates a unit.
    pub fn new(id: impl Into<String>, mut zones: Vec<Zone>) -> Result<Self, ConfigError> {
        let id = id.into();
        let invalid = |reason: String| ConfigError::InvalidUnit {
            unit: id.clone(),
            reason,
        };

        if zones.is_empty() {
            return Err(invalid("unit must have at least one operative zone".into()));
        }
        zones.sort_by_key(|z| z.number);
        for (expected, zone) in (1..).zip(&zones) {
            if zone.number != expected {
                return Err(invalid(format!(
                    "zone numbers must be contiguous from 1, found {} where {} was expected",
                    zone.number, expected
                )));
            }
            zone.validate().map_err(&invalid)?;
        }

        Ok(Self { id, zones })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Zone at 0-based position `index`.
    pub fn zone(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }

    /// Largest `p_max` over all zones.
    pub fn max_power(&self) -> f64 {
        self.zones
            .iter()
            .map(|z| z.p_max)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_curve_evaluation() {
        let curve = CostCurve::quadratic(100.0, 2.0, 0.01);
        // 100 + 2*50 + 0.01*2500
        assert!((curve.cost(50.0) - 225.0).abs() < 1e-12);
        // 2 + 2*0.01*50
        assert!((curve.marginal_cost(50.0) - 3.0).abs() < 1e-12);
        assert_eq!(curve.degree(), 2);
    }

    #[test]
    fn test_cubic_marginal_cost() {
        let curve = CostCurve::new(vec![1.0, 1.0, 1.0, 1.0]);
        // 1 + 2P + 3P^2 at P = 2
        assert!((curve.marginal_cost(2.0) - 17.0).abs() < 1e-12);
        assert!((curve.cost(2.0) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_curve_has_zero_marginal() {
        let curve = CostCurve::new(vec![42.0]);
        assert_eq!(curve.marginal_cost(10.0), 0.0);
        assert_eq!(curve.degree(), 0);
    }

    #[test]
    fn test_unit_sorts_zones() {
        let unit = Unit::new(
            "g1",
            vec![
                Zone::new(2, 60.0, 100.0, CostCurve::quadratic(0.0, 1.0, 0.0)),
                Zone::new(1, 10.0, 40.0, CostCurve::quadratic(0.0, 1.0, 0.0)),
            ],
        )
        .unwrap();
        assert_eq!(unit.zones()[0].number, 1);
        assert_eq!(unit.zone_count(), 2);
        assert!((unit.max_power() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_unit_rejects_empty() {
        let err = Unit::new("g1", vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUnit { .. }));
    }

    #[test]
    fn test_unit_rejects_gap_in_numbers() {
        let curve = CostCurve::quadratic(0.0, 1.0, 0.0);
        let err = Unit::new(
            "g1",
            vec![
                Zone::new(1, 0.0, 10.0, curve.clone()),
                Zone::new(3, 20.0, 30.0, curve),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("contiguous"));
    }

    #[test]
    fn test_unit_rejects_inverted_bounds() {
        let err = Unit::new(
            "g1",
            vec![Zone::new(1, 50.0, 10.0, CostCurve::quadratic(0.0, 1.0, 0.0))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_unit_rejects_negative_pmin() {
        let err = Unit::new(
            "g1",
            vec![Zone::new(1, -5.0, 10.0, CostCurve::quadratic(0.0, 1.0, 0.0))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_unit_rejects_cost_negative_inside_zone() {
        // 100 - 4P + 0.01P^2 bottoms out at -300 for P = 200
        let err = Unit::new(
            "1",
            vec![Zone::new(1, 150.0, 250.0, CostCurve::quadratic(100.0, -4.0, 0.01))],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUnit { .. }));

        // same curve stays positive on a low range
        assert!(Unit::new(
            "1",
            vec![Zone::new(1, 0.0, 20.0, CostCurve::quadratic(100.0, -4.0, 0.01))],
        )
        .is_ok());
    }

    #[test]
    fn test_unit_rejects_nan_coefficient() {
        let err = Unit::new(
            "g1",
            vec![Zone::new(1, 0.0, 10.0, CostCurve::quadratic(0.0, f64::NAN, 0.0))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("finite"));
    }
}
