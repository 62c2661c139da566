//! Pool entries and the pool's fill state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sm2::Rating;
use crate::types::{ItemId, UserId};

/// One item held in a user's review pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub user: UserId,
    pub item: ItemId,
    /// Leitner box; low levels are served first
    pub level: u32,
    /// Very-good ratings received while in the pool
    pub easy_streak: u32,
    /// Streak at which the entry becomes a purge candidate
    pub purge_threshold: u32,
    pub last_touched: DateTime<Utc>,
}

impl PoolEntry {
    pub fn new(user: UserId, item: ItemId, level: u32, purge_threshold: u32, now: DateTime<Utc>) -> Self {
        Self {
            user,
            item,
            level,
            easy_streak: 0,
            purge_threshold,
            last_touched: now,
        }
    }

    pub fn is_purge_candidate(&self) -> bool {
        self.easy_streak >= self.purge_threshold
    }

    /// Climb the levels of `promotion` and count it towards the easy streak
    pub fn promote(&mut self, promotion: &PoolPromotion) {
        self.level = self.level.saturating_add(promotion.level_delta);
        self.last_touched = promotion.touched_at;
        if promotion.easy {
            self.easy_streak += 1;
        }
    }
}

/// Result of loading a user's pool
#[derive(Debug, Clone, Default)]
pub struct PoolSnapshot {
    /// Entries, at most `limit` of them when the load was bounded
    pub entries: Vec<PoolEntry>,
    /// Number of entries actually stored for the user
    pub total: usize,
}

/// Pool level change caused by one rating
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolPromotion {
    pub level_delta: u32,
    /// Also bump the easy streak
    pub easy: bool,
    pub touched_at: DateTime<Utc>,
}

impl PoolPromotion {
    /// Promotion rule: climb `ordinal + 1` levels, count very-good streaks
    pub fn for_rating(rating: Rating, touched_at: DateTime<Utc>) -> Self {
        Self {
            level_delta: u32::from(rating.ordinal()) + 1,
            easy: rating == Rating::VeryGood,
            touched_at,
        }
    }
}

/// Fill state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Fewer entries than the capacity
    Filling,
    /// At capacity, nothing to purge
    FullClean,
    /// At capacity with at least one purge candidate
    FullPurgeable,
}

impl PoolState {
    pub fn of(entries: &[PoolEntry], capacity: usize) -> Self {
        if entries.len() < capacity {
            PoolState::Filling
        } else if entries.iter().any(PoolEntry::is_purge_candidate) {
            PoolState::FullPurgeable
        } else {
            PoolState::FullClean
        }
    }
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolState::Filling => write!(f, "filling"),
            PoolState::FullClean => write!(f, "full_clean"),
            PoolState::FullPurgeable => write!(f, "full_purgeable"),
        }
    }
}
