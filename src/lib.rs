//! Least-cost operation of thermal generation units with multiple
//! operative zones.
//!
//! Choosing one zone per unit is a discrete search; dispatching power
//! within the chosen zones is a continuous one. This crate couples the two:
//!
//! - **System model** ([`system`]): Units, zones, cost curves, zone
//!   assignments, and a JSON catalog of named systems.
//! - **Economic dispatch** ([`dispatch`]): Solves the continuous problem
//!   for a fixed assignment through a swappable solver capability.
//! - **Ant colony search** ([`colony`]): Samples assignments from a
//!   pheromone model, scores them by dispatch cost, and reinforces the
//!   cheapest with rank-differentiated evaporation.
//!
//! # Example
//!
//! ```
//! use u_acopower::colony::{ColonyConfig, PowerColony};
//! use u_acopower::system::SystemCatalog;
//!
//! let catalog = SystemCatalog::from_json_str(r#"{
//!     "s2": {
//!         "demand": 150.0,
//!         "data": [
//!             ["tgu", "opz", "a", "b", "c", "Pmin", "Pmax"],
//!             [1, 1, 20.0, 2.0, 0.010, 10, 60],
//!             [1, 2, 25.0, 2.2, 0.008, 80, 150],
//!             [2, 1, 15.0, 1.8, 0.020, 0, 100]
//!         ]
//!     }
//! }"#).unwrap();
//! let system = catalog.system("s2").unwrap();
//!
//! let mut colony = PowerColony::new(ColonyConfig::default().with_n_ants(10).with_seed(1), &system).unwrap();
//! colony.seek(10, &system, false).unwrap();
//! let best = colony.best().unwrap();
//! println!("best path {} costs {:.2}", best.operation, best.distance);
//! ```

pub mod colony;
pub mod dispatch;
pub mod error;
pub mod system;

pub use error::{ConfigError, Error, Result};
