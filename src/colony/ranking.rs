//! Three-way rank partition of one iteration's ants.

use super::config::RankSplit;
use serde::Serialize;

/// Performance group of an ant within its iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RankGroup {
    Best,
    Mean,
    Worst,
}

impl RankGroup {
    /// Order in which groups are applied during a pheromone update.
    ///
    /// The best group goes last so that its reinforcement is never
    /// evaporated by another group in the same iteration.
    pub const UPDATE_ORDER: [RankGroup; 3] = [RankGroup::Worst, RankGroup::Mean, RankGroup::Best];
}

/// Ant indices sorted best first.
///
/// Feasible ants always rank ahead of failed ones, whatever their
/// distances. Within each class ants are sorted by ascending distance,
/// ties broken by index.
///
/// # Panics
/// Panics if `distances` and `feasible` differ in length.
pub fn rank_order(distances: &[f64], feasible: &[bool]) -> Vec<usize> {
    assert_eq!(distances.len(), feasible.len(), "one feasibility flag per ant");
    let mut order: Vec<usize> = (0..distances.len()).collect();
    order.sort_by(|&a, &b| {
        feasible[b]
            .cmp(&feasible[a])
            .then(distances[a].total_cmp(&distances[b]))
            .then(a.cmp(&b))
    });
    order
}

/// Labels every ant as best, mean or worst.
///
/// The result is indexed like `distances`.
pub fn partition(distances: &[f64], feasible: &[bool], split: &RankSplit) -> Vec<RankGroup> {
    let n = distances.len();
    let (best, worst) = split.group_sizes(n);
    let mut groups = vec![RankGroup::Mean; n];
    for (rank, ant) in rank_order(distances, feasible).into_iter().enumerate() {
        if rank < best {
            groups[ant] = RankGroup::Best;
        } else if rank >= n - worst {
            groups[ant] = RankGroup::Worst;
        }
    }
    groups
}
