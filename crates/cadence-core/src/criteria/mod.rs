//! Sort Criteria
//!
//! Composable ranking predicates over an item's difficulty record and pool
//! entry. Three compositions are used by the engine:
//!
//! - **Default**: deck and global selection
//! - **Exploration**: default plus not-hard-first, every n-th selection
//! - **Poll fill**: replenishing the review pool
//!
//! Ties that survive every criterion are broken by a random draw, so two
//! calls with identical inputs may order items differently unless the
//! random source is seeded.

mod criterion;
mod ordering;

pub use criterion::{
    Candidate, Direction, SortCriterion, LONG_STALE_SECONDS, RECENT_DEMOTION_PROBABILITY,
    RECENT_WINDOW_SECONDS, SHORT_STALE_SECONDS,
};
pub use ordering::{
    exploration_ordering, ordering_for_selection, rank, DEFAULT_ORDERING, POLL_FILL_ORDERING,
    POOL_ORDERING,
};
