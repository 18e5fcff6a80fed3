//! Colony configuration.
//!
//! [`ColonyConfig`] holds every parameter of the search loop. Evaporation
//! is differentiated by [`RankGroup`], and the size of the best and worst
//! groups is set by [`RankSplit`].

use super::ranking::RankGroup;

/// Evaporation rate applied to the pheromone touched by each rank group.
///
/// Rates lie in `[0, 1]`. The usual ordering is `worst > mean > best`, so
/// elite paths keep their pheromone longest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaporationRates {
    pub worst: f64,
    pub mean: f64,
    pub best: f64,
}

impl Default for EvaporationRates {
    fn default() -> Self {
        Self {
            worst: 0.75,
            mean: 0.25,
            best: 0.05,
        }
    }
}

impl EvaporationRates {
    /// Creates rates, clamping each to `[0, 1]`.
    pub fn new(worst: f64, mean: f64, best: f64) -> Self {
        Self {
            worst: worst.clamp(0.0, 1.0),
            mean: mean.clamp(0.0, 1.0),
            best: best.clamp(0.0, 1.0),
        }
    }

    /// Same rate for every group.
    pub fn uniform(rate: f64) -> Self {
        Self::new(rate, rate, rate)
    }

    /// Rate for `group`.
    pub fn rate(&self, group: RankGroup) -> f64 {
        match group {
            RankGroup::Worst => self.worst,
            RankGroup::Mean => self.mean,
            RankGroup::Best => self.best,
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (name, rate) in [("worst", self.worst), ("mean", self.mean), ("best", self.best)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!("{name} evaporation rate must be in [0, 1], got {rate}"));
            }
        }
        Ok(())
    }
}

/// How many ants of one iteration count as best and as worst.
///
/// Everything in between is the mean group. When the two groups would
/// overlap, the best group wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankSplit {
    /// Fixed number of best and worst ants.
    Count { best: usize, worst: usize },

    /// Fraction of the population, rounded up, at least one ant when the
    /// fraction is positive.
    Fraction { best: f64, worst: f64 },
}

impl Default for RankSplit {
    fn default() -> Self {
        RankSplit::Count { best: 1, worst: 1 }
    }
}

impl RankSplit {
    /// Sizes of the best and worst groups for a population of `n`.
    pub fn group_sizes(&self, n: usize) -> (usize, usize) {
        let (best, worst) = match *self {
            RankSplit::Count { best, worst } => (best, worst),
            RankSplit::Fraction { best, worst } => (fraction_of(n, best), fraction_of(n, worst)),
        };
        let best = best.min(n);
        let worst = worst.min(n - best);
        (best, worst)
    }

    fn validate(&self) -> Result<(), String> {
        if let RankSplit::Fraction { best, worst } = *self {
            if !(0.0..=1.0).contains(&best) || !(0.0..=1.0).contains(&worst) {
                return Err("rank split fractions must be in [0, 1]".into());
            }
            if best + worst > 1.0 {
                return Err("rank split fractions must not exceed 1 in total".into());
            }
        }
        Ok(())
    }
}

fn fraction_of(n: usize, fraction: f64) -> usize {
    if fraction <= 0.0 {
        0
    } else {
        ((n as f64 * fraction - 1e-9).ceil() as usize).max(1)
    }
}

/// Configuration for [`PowerColony`](super::PowerColony).
///
/// # Defaults
///
/// ```
/// use u_acopower::colony::ColonyConfig;
///
/// let config = ColonyConfig::default();
/// assert_eq!(config.n_ants, 100);
/// assert!((config.evaporation.worst - 0.75).abs() < 1e-12);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_acopower::colony::{ColonyConfig, EvaporationRates, RankSplit};
///
/// let config = ColonyConfig::default()
///     .with_n_ants(20)
///     .with_evaporation(EvaporationRates::new(0.8, 0.3, 0.1))
///     .with_rank_split(RankSplit::Fraction { best: 0.1, worst: 0.1 })
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ColonyConfig {
    /// Ants (candidate operations) per iteration.
    pub n_ants: usize,

    /// Evaporation rate per rank group.
    pub evaporation: EvaporationRates,

    /// Size of the best and worst groups.
    pub rank_split: RankSplit,

    /// Weight of every (unit, zone) pair before the first update.
    pub initial_pheromone: f64,

    /// Lower bound on every pheromone weight.
    ///
    /// Keeps every zone reachable, even with an evaporation rate of 1.
    pub pheromone_floor: f64,

    /// Reinforcement numerator: a path of cost `d` deposits
    /// `deposit_scale / d` on each of its (unit, zone) pairs.
    pub deposit_scale: f64,

    /// Cost recorded for operations that cannot be dispatched.
    ///
    /// Must exceed any feasible cost of the system being searched.
    pub infeasible_cost: f64,

    /// Whether to evaluate the ants of one iteration in parallel.
    ///
    /// Only takes effect with the `parallel` feature.
    pub parallel: bool,

    /// Random seed for reproducibility.
    ///
    /// `None` uses a random seed.
    pub seed: Option<u64>,

    /// Whether to keep a pheromone snapshot after every iteration.
    pub keep_pheromone_history: bool,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            n_ants: 100,
            evaporation: EvaporationRates::default(),
            rank_split: RankSplit::default(),
            initial_pheromone: 1.0,
            pheromone_floor: 1e-6,
            deposit_scale: 1000.0,
            infeasible_cost: 1e12,
            parallel: true,
            seed: None,
            keep_pheromone_history: true,
        }
    }
}

impl ColonyConfig {
    pub fn with_n_ants(mut self, n: usize) -> Self {
        self.n_ants = n;
        self
    }

    pub fn with_evaporation(mut self, rates: EvaporationRates) -> Self {
        self.evaporation = rates;
        self
    }

    pub fn with_rank_split(mut self, split: RankSplit) -> Self {
        self.rank_split = split;
        self
    }

    pub fn with_initial_pheromone(mut self, weight: f64) -> Self {
        self.initial_pheromone = weight;
        self
    }

    pub fn with_pheromone_floor(mut self, floor: f64) -> Self {
        self.pheromone_floor = floor;
        self
    }

    pub fn with_deposit_scale(mut self, scale: f64) -> Self {
        self.deposit_scale = scale;
        self
    }

    pub fn with_infeasible_cost(mut self, cost: f64) -> Self {
        self.infeasible_cost = cost;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_pheromone_history(mut self, keep: bool) -> Self {
        self.keep_pheromone_history = keep;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `Err` with a description if any parameter is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_ants == 0 {
            return Err("n_ants must be at least 1".into());
        }
        self.evaporation.validate()?;
        self.rank_split.validate()?;
        if !(self.pheromone_floor.is_finite() && self.pheromone_floor > 0.0) {
            return Err("pheromone_floor must be positive".into());
        }
        if !self.initial_pheromone.is_finite() || self.initial_pheromone < self.pheromone_floor {
            return Err("initial_pheromone must be at least pheromone_floor".into());
        }
        if !(self.deposit_scale.is_finite() && self.deposit_scale >= 0.0) {
            return Err("deposit_scale must be non-negative".into());
        }
        if !(self.infeasible_cost.is_finite() && self.infeasible_cost > 0.0) {
            return Err("infeasible_cost must be a positive finite value".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ColonyConfig::default();
        assert_eq!(config.n_ants, 100);
        assert_eq!(config.rank_split, RankSplit::Count { best: 1, worst: 1 });
        assert!((config.evaporation.mean - 0.25).abs() < 1e-12);
        assert!((config.evaporation.best - 0.05).abs() < 1e-12);
        assert!(config.seed.is_none());
        assert!(config.keep_pheromone_history);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ColonyConfig::default()
            .with_n_ants(10)
            .with_evaporation(EvaporationRates::uniform(0.5))
            .with_initial_pheromone(2.0)
            .with_pheromone_floor(0.01)
            .with_deposit_scale(10.0)
            .with_infeasible_cost(1e9)
            .with_parallel(false)
            .with_seed(7)
            .with_pheromone_history(false);

        assert_eq!(config.n_ants, 10);
        assert_eq!(config.evaporation, EvaporationRates::new(0.5, 0.5, 0.5));
        assert!((config.initial_pheromone - 2.0).abs() < 1e-12);
        assert!((config.pheromone_floor - 0.01).abs() < 1e-12);
        assert!(!config.parallel);
        assert_eq!(config.seed, Some(7));
        assert!(!config.keep_pheromone_history);
    }

    #[test]
    fn test_rates_are_clamped() {
        let rates = EvaporationRates::new(1.5, -0.2, 0.3);
        assert_eq!(rates.worst, 1.0);
        assert_eq!(rates.mean, 0.0);
        assert_eq!(rates.rate(RankGroup::Best), 0.3);
    }

    #[test]
    fn test_validate_rejects_out_of_range_rate() {
        let mut config = ColonyConfig::default();
        config.evaporation.best = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_ants() {
        assert!(ColonyConfig::default().with_n_ants(0).validate().is_err());
    }

    #[test]
    fn test_validate_floor() {
        assert!(ColonyConfig::default().with_pheromone_floor(0.0).validate().is_err());
        assert!(ColonyConfig::default()
            .with_pheromone_floor(2.0)
            .with_initial_pheromone(1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_infeasible_cost() {
        assert!(ColonyConfig::default()
            .with_infeasible_cost(f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_group_sizes_count() {
        let split = RankSplit::Count { best: 1, worst: 1 };
        assert_eq!(split.group_sizes(10), (1, 1));
        assert_eq!(split.group_sizes(1), (1, 0));
        assert_eq!(RankSplit::Count { best: 3, worst: 4 }.group_sizes(5), (3, 2));
    }

    #[test]
    fn test_group_sizes_fraction() {
        let split = RankSplit::Fraction { best: 0.1, worst: 0.2 };
        assert_eq!(split.group_sizes(10), (1, 2));
        assert_eq!(split.group_sizes(3), (1, 1));
        assert_eq!(RankSplit::Fraction { best: 0.0, worst: 0.5 }.group_sizes(4), (0, 2));
    }

    #[test]
    fn test_validate_fraction() {
        let config = ColonyConfig::default().with_rank_split(RankSplit::Fraction {
            best: 0.7,
            worst: 0.5,
        });
        assert!(config.validate().is_err());
    }
}
