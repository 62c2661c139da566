//! Individual ranking predicates.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pool::PoolEntry;
use crate::sm2::DifficultyRecord;
use crate::types::Item;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Items rated more recently than this count as just touched
pub const RECENT_WINDOW_SECONDS: i64 = 60;

/// Probability that a just-touched item is pushed back
pub const RECENT_DEMOTION_PROBABILITY: f64 = 0.7;

/// Short staleness threshold
pub const SHORT_STALE_SECONDS: i64 = 15;

/// Long staleness threshold
pub const LONG_STALE_SECONDS: i64 = 5 * 60;

// ============================================================================
// CANDIDATE
// ============================================================================

/// An item together with the scheduling state the criteria look at
#[derive(Debug, Clone)]
pub struct Candidate {
    pub item: Item,
    pub difficulty: Option<DifficultyRecord>,
    pub pool: Option<PoolEntry>,
}

impl Candidate {
    pub fn new(item: Item, difficulty: Option<DifficultyRecord>, pool: Option<PoolEntry>) -> Self {
        Self {
            item,
            difficulty,
            pool,
        }
    }

    /// Latest of the last rating and the last pool touch
    pub fn last_touched(&self) -> Option<DateTime<Utc>> {
        let rated = self.difficulty.as_ref().and_then(|d| d.updated_at);
        let pooled = self.pool.as_ref().map(|p| p.last_touched);
        match (rated, pooled) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    fn untouched_for(&self, now: DateTime<Utc>, seconds: i64) -> bool {
        match self.last_touched() {
            Some(at) => now - at >= Duration::seconds(seconds),
            None => true,
        }
    }

    fn interval(&self) -> f64 {
        self.difficulty.as_ref().map_or(0.0, |d| d.interval)
    }
}

// ============================================================================
// SORT CRITERION
// ============================================================================

/// Sort direction of a criterion's raw key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Stateless ranking rule.
///
/// Lists of criteria are evaluated left to right; later criteria only break
/// ties left by earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCriterion {
    /// Items without any rating first
    NotRatedFirst,
    /// Shortest interval first
    HardFirst,
    /// Longest interval first
    NotHardFirst,
    /// Least recently rated first
    OldestUpdateFirst,
    /// Items whose interval elapsed since the last rating first
    ScheduledForTodayFirst,
    /// Just-touched items are pushed back with 70 % probability
    RandomizeRecent,
    /// Items untouched for at least 15 s first
    StaleFor15Seconds,
    /// Items untouched for at least 5 min first
    StaleFor5Minutes,
    /// Lowest Leitner level first
    LowestLevelFirst,
    /// Least recently touched pool entry first
    LeastRecentlyTouchedFirst,
}

impl SortCriterion {
    pub fn direction(self) -> Direction {
        match self {
            SortCriterion::NotHardFirst => Direction::Descending,
            _ => Direction::Ascending,
        }
    }

    /// Whether the key involves a random draw
    pub fn is_random(self) -> bool {
        matches!(self, SortCriterion::RandomizeRecent)
    }

    /// Raw ordering key of `candidate` before the direction is applied
    pub fn raw_key<R: Rng>(self, candidate: &Candidate, now: DateTime<Utc>, rng: &mut R) -> f64 {
        match self {
            SortCriterion::NotRatedFirst => {
                let rated = candidate.difficulty.as_ref().is_some_and(DifficultyRecord::is_rated);
                flag(rated)
            }
            SortCriterion::HardFirst | SortCriterion::NotHardFirst => candidate.interval(),
            SortCriterion::OldestUpdateFirst => candidate
                .difficulty
                .as_ref()
                .and_then(|d| d.updated_at)
                .map_or(f64::NEG_INFINITY, |at| at.timestamp_millis() as f64),
            SortCriterion::ScheduledForTodayFirst => {
                let due = candidate.difficulty.as_ref().is_none_or(|d| d.is_due(now));
                flag(!due)
            }
            SortCriterion::RandomizeRecent => {
                let recent = !candidate.untouched_for(now, RECENT_WINDOW_SECONDS);
                flag(recent && rng.gen_bool(RECENT_DEMOTION_PROBABILITY))
            }
            SortCriterion::StaleFor15Seconds => {
                flag(!candidate.untouched_for(now, SHORT_STALE_SECONDS))
            }
            SortCriterion::StaleFor5Minutes => flag(!candidate.untouched_for(now, LONG_STALE_SECONDS)),
            SortCriterion::LowestLevelFirst => candidate
                .pool
                .as_ref()
                .map_or(f64::INFINITY, |p| f64::from(p.level)),
            SortCriterion::LeastRecentlyTouchedFirst => candidate
                .pool
                .as_ref()
                .map_or(f64::INFINITY, |p| p.last_touched.timestamp_millis() as f64),
        }
    }

    /// Ordering key, ascending after the direction is applied
    pub fn sort_key<R: Rng>(self, candidate: &Candidate, now: DateTime<Utc>, rng: &mut R) -> f64 {
        let key = self.raw_key(candidate, now, rng);
        match self.direction() {
            Direction::Ascending => key,
            Direction::Descending => -key,
        }
    }
}

impl std::fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SortCriterion::NotRatedFirst => "not_rated_first",
            SortCriterion::HardFirst => "hard_first",
            SortCriterion::NotHardFirst => "not_hard_first",
            SortCriterion::OldestUpdateFirst => "oldest_update_first",
            SortCriterion::ScheduledForTodayFirst => "scheduled_for_today_first",
            SortCriterion::RandomizeRecent => "randomize_recent",
            SortCriterion::StaleFor15Seconds => "stale_for_15_seconds",
            SortCriterion::StaleFor5Minutes => "stale_for_5_minutes",
            SortCriterion::LowestLevelFirst => "lowest_level_first",
            SortCriterion::LeastRecentlyTouchedFirst => "least_recently_touched_first",
        };
        write!(f, "{}", name)
    }
}

/// `false` sorts before `true`
fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
