//! Pheromone model.
//!
//! One row of weights per unit, one weight per zone of that unit. Rows
//! have different lengths when units have different zone counts. Every
//! weight stays at or above a positive floor so no zone becomes
//! unreachable.

use super::config::EvaporationRates;
use super::ranking::RankGroup;
use crate::system::Operation;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

/// A path together with its rank group and the amount it deposits.
#[derive(Debug, Clone, Copy)]
pub struct RankedPath<'a> {
    pub operation: &'a Operation,
    pub group: RankGroup,
    pub reinforcement: f64,
}

/// Ragged (unit, zone) → weight matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PheromoneMatrix {
    rows: Vec<Vec<f64>>,
    floor: f64,
}

impl PheromoneMatrix {
    /// Matrix with `initial` on every zone of every unit.
    ///
    /// `initial` is raised to `floor` if it is lower.
    pub fn uniform(zone_counts: &[usize], initial: f64, floor: f64) -> Self {
        let weight = initial.max(floor);
        Self {
            rows: zone_counts.iter().map(|&k| vec![weight; k]).collect(),
            floor,
        }
    }

    pub fn unit_count(&self) -> usize {
        self.rows.len()
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Zone count of every row.
    pub fn zone_counts(&self) -> Vec<usize> {
        self.rows.iter().map(Vec::len).collect()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Weights of one unit.
    pub fn row(&self, unit: usize) -> Option<&[f64]> {
        self.rows.get(unit).map(Vec::as_slice)
    }

    pub fn get(&self, unit: usize, zone: usize) -> Option<f64> {
        self.rows.get(unit)?.get(zone).copied()
    }

    /// Smallest weight in the matrix.
    pub fn min_weight(&self) -> f64 {
        self.rows
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Selection probabilities of one unit's zones.
    pub fn probabilities(&self, unit: usize) -> Option<Vec<f64>> {
        let row = self.rows.get(unit)?;
        let total: f64 = row.iter().sum();
        Some(row.iter().map(|w| w / total).collect())
    }

    /// Draws one zone of `unit` with probability proportional to its weight.
    ///
    /// # Panics
    /// Panics if `unit` is out of range.
    pub fn choose_zone<R: Rng>(&self, unit: usize, rng: &mut R) -> usize {
        let row = &self.rows[unit];
        let total: f64 = row.iter().sum();
        if row.len() == 1 || !(total > 0.0 && total.is_finite()) {
            return rng.random_range(0..row.len());
        }

        let threshold = rng.random_range(0.0..total);
        let mut cumulative = 0.0;
        for (zone, &w) in row.iter().enumerate() {
            cumulative += w;
            if cumulative > threshold {
                return zone;
            }
        }

        row.len() - 1 // floating-point fallback
    }

    /// Draws one zone per unit, independently across units.
    pub fn choose_path<R: Rng>(&self, rng: &mut R) -> Operation {
        let zones = (0..self.rows.len())
            .map(|unit| self.choose_zone(unit, rng))
            .collect();
        Operation::from_indices(zones)
    }

    /// Draws `n` independent paths.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<Operation> {
        (0..n).map(|_| self.choose_path(rng)).collect()
    }

    /// Applies one iteration's elitist evaporation and reinforcement.
    ///
    /// Groups are processed worst, mean, best. Within a group, each
    /// (unit, zone) pair touched by at least one of the group's paths is
    /// updated once:
    ///
    /// `w ← w · (1 − ρ_group) + Σ reinforcement`
    ///
    /// where the sum runs over the group's paths through that pair.
    /// Untouched pairs keep their weight. Every weight is then raised to
    /// the floor.
    pub fn update(&mut self, paths: &[RankedPath<'_>], rates: &EvaporationRates) {
        for group in RankGroup::UPDATE_ORDER {
            let mut deposits: BTreeMap<(usize, usize), f64> = BTreeMap::new();
            for path in paths.iter().filter(|p| p.group == group) {
                for (unit, &zone) in path.operation.zones().iter().enumerate() {
                    *deposits.entry((unit, zone)).or_insert(0.0) += path.reinforcement;
                }
            }

            let keep = 1.0 - rates.rate(group);
            for ((unit, zone), deposit) in deposits {
                if let Some(w) = self.rows.get_mut(unit).and_then(|r| r.get_mut(zone)) {
                    *w = *w * keep + deposit;
                }
            }
        }

        let floor = self.floor;
        for w in self.rows.iter_mut().flatten() {
            if !(*w >= floor) {
                *w = floor;
            }
        }
    }
}
