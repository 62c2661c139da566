//! Named compositions of criteria and the shared ranking routine.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rand::Rng;

use super::criterion::{Candidate, SortCriterion};

/// Ordering used for deck and global selection
pub const DEFAULT_ORDERING: [SortCriterion; 7] = [
    SortCriterion::StaleFor15Seconds,
    SortCriterion::RandomizeRecent,
    SortCriterion::ScheduledForTodayFirst,
    SortCriterion::NotRatedFirst,
    SortCriterion::StaleFor5Minutes,
    SortCriterion::HardFirst,
    SortCriterion::OldestUpdateFirst,
];

/// Ranking used to replenish the review pool
pub const POLL_FILL_ORDERING: [SortCriterion; 4] = [
    SortCriterion::ScheduledForTodayFirst,
    SortCriterion::StaleFor5Minutes,
    SortCriterion::HardFirst,
    SortCriterion::OldestUpdateFirst,
];

/// Serving order inside the review pool
pub const POOL_ORDERING: [SortCriterion; 2] = [
    SortCriterion::LowestLevelFirst,
    SortCriterion::LeastRecentlyTouchedFirst,
];

/// Default ordering with not-hard-first placed ahead of hard-first
pub fn exploration_ordering() -> Vec<SortCriterion> {
    let mut criteria = Vec::with_capacity(DEFAULT_ORDERING.len() + 1);
    for criterion in DEFAULT_ORDERING {
        if criterion == SortCriterion::HardFirst {
            criteria.push(SortCriterion::NotHardFirst);
        }
        criteria.push(criterion);
    }
    criteria
}

/// Ordering for the `selection_index`-th selection (0-based).
///
/// Every `every`-th selection explores with [`exploration_ordering`] so
/// sessions do not keep drilling only the hardest items.
pub fn ordering_for_selection(selection_index: u32, every: usize) -> Vec<SortCriterion> {
    let every = every.max(1);
    if (selection_index as usize) % every == every - 1 {
        exploration_ordering()
    } else {
        DEFAULT_ORDERING.to_vec()
    }
}

/// Order `candidates` by `criteria`.
///
/// Keys are computed once per candidate, consuming `rng` for the random
/// criteria and a final jitter that resolves exact ties. With a seeded
/// generator the result is a pure function of the inputs.
pub fn rank<R: Rng>(
    candidates: Vec<Candidate>,
    criteria: &[SortCriterion],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Candidate> {
    let mut keyed: Vec<(Vec<f64>, u64, Candidate)> = candidates
        .into_iter()
        .map(|candidate| {
            let keys = criteria
                .iter()
                .map(|criterion| criterion.sort_key(&candidate, now, rng))
                .collect();
            let jitter = rng.r#gen::<u64>();
            (keys, jitter, candidate)
        })
        .collect();

    keyed.sort_by(|a, b| compare_keys(&a.0, &b.0).then(a.1.cmp(&b.1)));
    keyed.into_iter().map(|(_, _, candidate)| candidate).collect()
}

fn compare_keys(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
