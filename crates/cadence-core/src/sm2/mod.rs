//! SM-2 Difficulty Model
//!
//! A SuperMemo-2 variant over a four-step rating scale
//! (unknown / weak / good / very good).
//!
//! ## Core Formulas:
//! - Ease: EF' = EF + 0.1 - (3 - r) * (0.08 + (3 - r) * 0.02), floored at 1.3
//! - Interval on success: 1 (good) or 6 (very good), then 6, then I * EF
//! - Interval on failure: 1, with the repetition count reset to 0

mod algorithm;
mod record;

pub use algorithm::{
    next_ease_ratio, next_interval, round_ratio, DEFAULT_EASE_RATIO, FIRST_INTERVAL,
    FIRST_INTERVAL_VERY_GOOD, MIN_EASE_RATIO, RESET_INTERVAL, SECOND_INTERVAL,
};
pub use record::{DifficultyModel, DifficultyRecord, Rating};
