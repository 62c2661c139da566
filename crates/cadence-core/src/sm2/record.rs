//! Ratings and the per-user, per-item difficulty record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::{next_ease_ratio, next_interval, DEFAULT_EASE_RATIO};
use crate::types::{ItemId, UserId};

// ============================================================================
// RATING
// ============================================================================

/// User-supplied correctness signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// Not recalled at all
    Unknown,
    /// Recalled with serious trouble
    Weak,
    /// Recalled
    Good,
    /// Recalled effortlessly
    VeryGood,
}

impl Rating {
    /// All ratings, weakest first
    pub const ALL: [Rating; 4] = [Rating::Unknown, Rating::Weak, Rating::Good, Rating::VeryGood];

    /// Position on the scale, 0..=3
    pub fn ordinal(self) -> u8 {
        match self {
            Rating::Unknown => 0,
            Rating::Weak => 1,
            Rating::Good => 2,
            Rating::VeryGood => 3,
        }
    }

    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Rating::Unknown),
            1 => Some(Rating::Weak),
            2 => Some(Rating::Good),
            3 => Some(Rating::VeryGood),
            _ => None,
        }
    }

    /// Good or better
    pub fn is_success(self) -> bool {
        self >= Rating::Good
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rating::Unknown => write!(f, "unknown"),
            Rating::Weak => write!(f, "weak"),
            Rating::Good => write!(f, "good"),
            Rating::VeryGood => write!(f, "very_good"),
        }
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(Rating::Unknown),
            "weak" => Ok(Rating::Weak),
            "good" => Ok(Rating::Good),
            "very_good" | "very-good" => Ok(Rating::VeryGood),
            _ => Err(format!("Unknown rating: {}", s)),
        }
    }
}

// ============================================================================
// DIFFICULTY RECORD
// ============================================================================

/// SM-2 state of one item for one user.
///
/// Created lazily on the first rating and only changed through
/// [`DifficultyModel::apply`]. `ease_ratio` never drops below 1.3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRecord {
    pub user: UserId,
    pub item: ItemId,
    /// Multiplier applied to the interval on sustained success
    pub ease_ratio: f64,
    /// Review interval in days
    pub interval: f64,
    /// Consecutive successes
    pub repetition_count: u32,
    /// Weakest rating ever given
    pub min_rating: Option<Rating>,
    /// Ratings received since the user's current session started
    pub session_repetitions: u32,
    pub last_rating: Option<Rating>,
    /// Time of the last rating
    pub updated_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version; 0 until first persisted
    pub version: u64,
}

impl DifficultyRecord {
    /// A record that has never been rated
    pub fn new(user: UserId, item: ItemId) -> Self {
        Self {
            user,
            item,
            ease_ratio: DEFAULT_EASE_RATIO,
            interval: 0.0,
            repetition_count: 0,
            min_rating: None,
            session_repetitions: 0,
            last_rating: None,
            updated_at: None,
            version: 0,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.last_rating.is_some()
    }

    /// Days since the last rating, `None` when never rated
    pub fn days_since_update(&self, now: DateTime<Utc>) -> Option<f64> {
        self.updated_at
            .map(|at| (now - at).num_milliseconds() as f64 / 86_400_000.0)
    }

    /// The interval has elapsed since the last rating (unrated records are due)
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.days_since_update(now) {
            Some(elapsed) => elapsed >= self.interval,
            None => true,
        }
    }
}

// ============================================================================
// DIFFICULTY MODEL
// ============================================================================

/// The SM-2 transition function
#[derive(Debug, Clone, Copy, Default)]
pub struct DifficultyModel;

impl DifficultyModel {
    /// Next state of `record` after `rating`.
    ///
    /// Pure: timestamps and versions are left to the caller.
    pub fn apply(record: &DifficultyRecord, rating: Rating) -> DifficultyRecord {
        let interval = next_interval(
            record.interval,
            record.ease_ratio,
            record.repetition_count,
            rating,
        );
        let repetition_count = if rating.is_success() {
            record.repetition_count + 1
        } else {
            0
        };
        let min_rating = match record.min_rating {
            Some(current) => current.min(rating),
            None => rating,
        };

        DifficultyRecord {
            ease_ratio: next_ease_ratio(record.ease_ratio, rating),
            interval,
            repetition_count,
            min_rating: Some(min_rating),
            session_repetitions: record.session_repetitions + 1,
            last_rating: Some(rating),
            ..record.clone()
        }
    }

    /// Zero the per-session repetition counter
    pub fn reset_session(record: &DifficultyRecord) -> DifficultyRecord {
        DifficultyRecord {
            session_repetitions: 0,
            ..record.clone()
        }
    }
}
