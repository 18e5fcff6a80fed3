//! Colony search loop.
//!
//! [`PowerColony`] seeds itself on construction (iteration 0), then each
//! call to [`PowerColony::seek`] runs further iterations:
//! sample → dispatch → rank → update pheromone → record.

use super::config::ColonyConfig;
use super::pheromone::{PheromoneMatrix, RankedPath};
use super::ranking::{partition, rank_order, RankGroup};
use crate::dispatch::DispatchEvaluator;
use crate::error::{ConfigError, Error, Result};
use crate::system::{Operation, PowerSystem};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// How an ant's operation fared in the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AntStatus {
    /// Dispatched successfully; the distance is the dispatch cost.
    Optimal,
    /// The selected zones cannot meet the demand.
    Infeasible,
    /// The solver failed for a numerical reason.
    NumericalFailure,
}

/// One ant of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathRecord {
    /// Iteration index; 0 is the seeding iteration.
    pub iteration: usize,
    /// 1-based ant number within the iteration.
    pub ant: usize,
    /// Zone assignment the ant chose.
    pub operation: Operation,
    /// Dispatch cost, or the configured sentinel for failed dispatches.
    pub distance: f64,
    pub status: AntStatus,
    /// Rank group within the iteration.
    pub group: RankGroup,
    /// Amount deposited on each (unit, zone) pair of the path.
    pub reinforcement: f64,
}

/// Summary statistics of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationStats {
    pub iteration: usize,
    /// Distance of the top-ranked ant of this iteration.
    pub best: f64,
    /// Mean distance of this iteration.
    pub mean: f64,
    /// Distance of the bottom-ranked ant of this iteration.
    pub worst: f64,
    /// Distance of the best path so far, this iteration included.
    pub best_so_far: f64,
    /// Ants whose dispatch failed.
    pub failures: usize,
}

/// Outcome of one [`PowerColony::seek`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekSummary {
    /// Iterations completed during this call.
    pub iterations: usize,
    /// Whether the call stopped on the cancellation flag.
    pub cancelled: bool,
    /// Distance of the best path since the colony was created.
    pub best_distance: f64,
}

/// Ant colony searching the operative zones of a [`PowerSystem`].
///
/// # Usage
///
/// ```
/// use u_acopower::colony::{ColonyConfig, PowerColony};
/// use u_acopower::system::{CostCurve, PowerSystem, Unit, Zone};
///
/// let curve = CostCurve::quadratic(10.0, 2.0, 0.01);
/// let units = vec![
///     Unit::new("1", vec![
///         Zone::new(1, 0.0, 60.0, curve.clone()),
///         Zone::new(2, 80.0, 150.0, curve.clone()),
///     ]).unwrap(),
///     Unit::new("2", vec![Zone::new(1, 0.0, 100.0, curve)]).unwrap(),
/// ];
/// let system = PowerSystem::new("demo", units, 150.0).unwrap();
///
/// let config = ColonyConfig::default().with_n_ants(8).with_seed(42);
/// let mut colony = PowerColony::new(config, &system).unwrap();
/// colony.seek(5, &system, false).unwrap();
///
/// assert_eq!(colony.paths().len(), 8 * 6);
/// assert!(colony.best().is_some());
/// ```
#[derive(Debug)]
pub struct PowerColony {
    config: ColonyConfig,
    evaluator: DispatchEvaluator,
    rng: StdRng,
    pheromone: PheromoneMatrix,
    paths: Vec<PathRecord>,
    pheromone_history: Vec<PheromoneMatrix>,
    stats: Vec<IterationStats>,
    best: Option<usize>,
}

impl PowerColony {
    /// Creates a colony with the default dispatch evaluator and runs the
    /// seeding iteration against `power_system`.
    pub fn new(config: ColonyConfig, power_system: &PowerSystem) -> Result<Self> {
        Self::with_evaluator(config, DispatchEvaluator::default(), power_system)
    }

    /// Creates a colony that dispatches with `evaluator`.
    ///
    /// The seeding iteration draws every ant uniformly from the system's
    /// zones, evaluates it, and applies the first pheromone update.
    pub fn with_evaluator(
        config: ColonyConfig,
        evaluator: DispatchEvaluator,
        power_system: &PowerSystem,
    ) -> Result<Self> {
        config.validate().map_err(ConfigError::InvalidColony)?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };
        let pheromone = PheromoneMatrix::uniform(
            &power_system.zone_counts(),
            config.initial_pheromone,
            config.pheromone_floor,
        );

        let operations: Vec<Operation> = (0..config.n_ants)
            .map(|_| power_system.sample_operation(&mut rng))
            .collect();

        let mut colony = Self {
            config,
            evaluator,
            rng,
            pheromone,
            paths: Vec::new(),
            pheromone_history: Vec::new(),
            stats: Vec::new(),
            best: None,
        };
        colony.step(0, operations, power_system, false)?;
        Ok(colony)
    }

    /// Runs `max_iter` more iterations against `power_system`.
    ///
    /// `show_progress` logs each iteration at `info` instead of `debug`.
    pub fn seek(
        &mut self,
        max_iter: usize,
        power_system: &PowerSystem,
        show_progress: bool,
    ) -> Result<SeekSummary> {
        self.seek_with_cancel(max_iter, power_system, show_progress, None)
    }

    /// Runs `max_iter` more iterations with an optional cancellation flag.
    ///
    /// The flag is checked before each iteration. When it is set the call
    /// returns, keeping the state of the last completed iteration.
    pub fn seek_with_cancel(
        &mut self,
        max_iter: usize,
        power_system: &PowerSystem,
        show_progress: bool,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SeekSummary> {
        if power_system.zone_counts() != self.pheromone.zone_counts() {
            return Err(ConfigError::InvalidSystem {
                system: power_system.name().to_string(),
                reason: "zone layout does not match the colony's pheromone matrix".into(),
            }
            .into());
        }

        let mut completed = 0;
        let mut cancelled = false;
        for _ in 0..max_iter {
            if let Some(ref flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
            }

            let iteration = self.iterations();
            let operations = self.pheromone.sample(self.config.n_ants, &mut self.rng);
            self.step(iteration, operations, power_system, show_progress)?;
            completed += 1;
        }

        Ok(SeekSummary {
            iterations: completed,
            cancelled,
            best_distance: self.best_distance(),
        })
    }

    /// Evaluates, ranks and records one iteration, then updates the
    /// pheromone.
    fn step(
        &mut self,
        iteration: usize,
        operations: Vec<Operation>,
        power_system: &PowerSystem,
        show_progress: bool,
    ) -> Result<()> {
        let outcomes = evaluate_ants(
            &self.evaluator,
            power_system,
            &operations,
            self.config.infeasible_cost,
            self.config.parallel,
        )?;
        let distances: Vec<f64> = outcomes.iter().map(|o| o.0).collect();
        let feasible: Vec<bool> = outcomes
            .iter()
            .map(|o| o.1 == AntStatus::Optimal)
            .collect();
        let groups = partition(&distances, &feasible, &self.config.rank_split);
        let order = rank_order(&distances, &feasible);

        // Failed ants never deposit more than the costliest feasible ant.
        let scale = self.config.deposit_scale;
        let failure_reinforcement = distances
            .iter()
            .zip(&feasible)
            .filter(|&(_, ok)| *ok)
            .map(|(d, _)| reinforcement(scale, *d))
            .fold(reinforcement(scale, self.config.infeasible_cost), f64::min);

        let records: Vec<PathRecord> = operations
            .into_iter()
            .zip(outcomes)
            .zip(groups)
            .enumerate()
            .map(|(i, ((operation, (distance, status)), group))| PathRecord {
                iteration,
                ant: i + 1,
                operation,
                distance,
                status,
                group,
                reinforcement: if status == AntStatus::Optimal {
                    reinforcement(scale, distance)
                } else {
                    failure_reinforcement
                },
            })
            .collect();

        let ranked: Vec<RankedPath<'_>> = records
            .iter()
            .map(|r| RankedPath {
                operation: &r.operation,
                group: r.group,
                reinforcement: r.reinforcement,
            })
            .collect();
        self.pheromone.update(&ranked, &self.config.evaporation);
        if self.config.keep_pheromone_history {
            self.pheromone_history.push(self.pheromone.clone());
        }

        let offset = self.paths.len();
        self.paths.extend(records);
        for (i, record) in self.paths[offset..].iter().enumerate() {
            trace!(
                iteration,
                ant = record.ant,
                path = %record.operation,
                distance = record.distance,
                status = ?record.status,
                "ant evaluated"
            );
            let improves = self
                .best
                .map_or(true, |b| ranks_before(record, &self.paths[b]));
            if improves {
                self.best = Some(offset + i);
            }
        }

        let stats = IterationStats {
            iteration,
            best: order.first().map_or(f64::NAN, |&i| distances[i]),
            mean: distances.iter().sum::<f64>() / distances.len() as f64,
            worst: order.last().map_or(f64::NAN, |&i| distances[i]),
            best_so_far: self.best_distance(),
            failures: self.paths[offset..]
                .iter()
                .filter(|r| r.status != AntStatus::Optimal)
                .count(),
        };
        if show_progress {
            info!(
                iteration,
                best = stats.best,
                mean = stats.mean,
                best_so_far = stats.best_so_far,
                failures = stats.failures,
                "colony iteration"
            );
        } else {
            debug!(
                iteration,
                best = stats.best,
                best_so_far = stats.best_so_far,
                failures = stats.failures,
                "colony iteration"
            );
        }

        self.stats.push(stats);
        Ok(())
    }

    /// Draws one operation from the current pheromone.
    pub fn choose_path<R: Rng>(&self, rng: &mut R) -> Operation {
        self.pheromone.choose_path(rng)
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn n_ants(&self) -> usize {
        self.config.n_ants
    }

    /// Completed iterations, the seeding iteration included.
    pub fn iterations(&self) -> usize {
        self.stats.len()
    }

    /// Every path recorded so far, in iteration then ant order.
    pub fn paths(&self) -> &[PathRecord] {
        &self.paths
    }

    /// Paths of one iteration.
    pub fn iteration_paths(&self, iteration: usize) -> &[PathRecord] {
        let n = self.config.n_ants;
        let start = (iteration * n).min(self.paths.len());
        let end = (start + n).min(self.paths.len());
        &self.paths[start..end]
    }

    /// Current pheromone matrix.
    pub fn pheromone(&self) -> &PheromoneMatrix {
        &self.pheromone
    }

    /// Pheromone after each iteration, in iteration order.
    ///
    /// Empty when `keep_pheromone_history` is off.
    pub fn pheromone_history(&self) -> &[PheromoneMatrix] {
        &self.pheromone_history
    }

    /// Per-iteration statistics.
    pub fn stats(&self) -> &[IterationStats] {
        &self.stats
    }

    /// Best path seen so far: the cheapest feasible one, or the cheapest
    /// failed one while no ant has been feasible. Ties keep the earliest.
    pub fn best(&self) -> Option<&PathRecord> {
        self.best.map(|i| &self.paths[i])
    }

    fn best_distance(&self) -> f64 {
        self.best().map_or(f64::INFINITY, |r| r.distance)
    }
}

/// Deposit of a path with the given cost. Lower costs deposit more.
fn reinforcement(scale: f64, distance: f64) -> f64 {
    scale / distance.max(f64::EPSILON)
}

/// Whether `a` is a better path than `b`: feasible before failed, then
/// cheaper first. Equal paths keep the earlier one.
fn ranks_before(a: &PathRecord, b: &PathRecord) -> bool {
    let a_ok = a.status == AntStatus::Optimal;
    let b_ok = b.status == AntStatus::Optimal;
    (a_ok && !b_ok) || (a_ok == b_ok && a.distance < b.distance)
}

/// Dispatches every ant, mapping recoverable failures to the sentinel cost.
fn evaluate_ants(
    evaluator: &DispatchEvaluator,
    power_system: &PowerSystem,
    operations: &[Operation],
    infeasible_cost: f64,
    parallel: bool,
) -> Result<Vec<(f64, AntStatus)>> {
    let evaluate = |operation: &Operation| -> Result<(f64, AntStatus)> {
        match evaluator.evaluate(power_system, operation) {
            Ok(result) => Ok((result.total_cost, AntStatus::Optimal)),
            Err(Error::Infeasible { .. }) => Ok((infeasible_cost, AntStatus::Infeasible)),
            Err(Error::SolverNumericalFailure { .. }) => {
                Ok((infeasible_cost, AntStatus::NumericalFailure))
            }
            Err(e) => Err(e),
        }
    };

    #[cfg(feature = "parallel")]
    if parallel {
        return operations.par_iter().map(&evaluate).collect();
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    operations.iter().map(&evaluate).collect()
}

// ============================================================================
// Tests
// ============================================================================
