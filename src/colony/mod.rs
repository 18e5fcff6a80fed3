//! Ant colony search over operative-zone assignments.
//!
//! Each ant picks one zone per unit by sampling the pheromone row of that
//! unit. Its path is scored by the economic dispatch of the resulting
//! [`Operation`](crate::system::Operation); operations that cannot be
//! dispatched get a large sentinel cost so the colony steers away from
//! them without stopping.
//!
//! After each iteration the ants are split into best, mean and worst
//! groups. The pheromone on a group's paths evaporates at that group's
//! rate and is reinforced in proportion to the inverse path cost, so
//! elite paths decay slowest while being reinforced most.
//!
//! # Key Types
//!
//! - [`ColonyConfig`]: Search parameters (ants, evaporation, rank split, seed)
//! - [`PowerColony`]: Seeds on construction and runs iterations on [`PowerColony::seek`]
//! - [`PheromoneMatrix`]: Ragged (unit, zone) weights with a positive floor
//! - [`PathRecord`]: One ant of one iteration, kept for analysis
//!
//! # References
//!
//! - Dorigo & Stützle (2004), *Ant Colony Optimization*
//! - Stützle & Hoos (2000), "MAX–MIN Ant System"

mod config;
mod pheromone;
mod ranking;
mod runner;

pub use config::{ColonyConfig, EvaporationRates, RankSplit};
pub use pheromone::{PheromoneMatrix, RankedPath};
pub use ranking::{partition, rank_order, RankGroup};
pub use runner::{AntStatus, IterationStats, PathRecord, PowerColony, SeekSummary};
