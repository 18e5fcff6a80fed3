//! Power system model.
//!
//! A [`PowerSystem`] is an ordered set of thermal generation [`Unit`]s that
//! must jointly meet one demand. Each unit runs in one of several operative
//! [`Zone`]s, and an [`Operation`] picks one zone per unit.
//!
//! Systems are built programmatically with [`PowerSystem::new`] or loaded
//! by name from a JSON [`SystemCatalog`].

mod catalog;
mod model;
mod types;

pub use catalog::SystemCatalog;
pub use model::{Operation, PowerSystem};
pub use types::{CostCurve, Unit, Zone};
