//! SM-2 formulas as free functions over plain numbers.

use super::record::Rating;

/// Ease ratio of a record that has never been rated
pub const DEFAULT_EASE_RATIO: f64 = 2.5;

/// Lower bound of the ease ratio
pub const MIN_EASE_RATIO: f64 = 1.3;

/// Interval (days) after a first success rated good
pub const FIRST_INTERVAL: f64 = 1.0;

/// Interval (days) after a first success rated very good
pub const FIRST_INTERVAL_VERY_GOOD: f64 = 6.0;

/// Interval (days) after the second consecutive success
pub const SECOND_INTERVAL: f64 = 6.0;

/// Interval (days) after a failed recall
pub const RESET_INTERVAL: f64 = 1.0;

const RATIO_PRECISION: f64 = 1_000_000.0;

/// Round a ratio to six decimal places
pub fn round_ratio(ratio: f64) -> f64 {
    (ratio * RATIO_PRECISION).round() / RATIO_PRECISION
}

/// Ease ratio after `rating`, applied on success and failure alike
pub fn next_ease_ratio(ease_ratio: f64, rating: Rating) -> f64 {
    let distance = f64::from(Rating::VeryGood.ordinal() - rating.ordinal());
    let adjusted = ease_ratio + 0.1 - distance * (0.08 + distance * 0.02);
    round_ratio(adjusted.max(MIN_EASE_RATIO))
}

/// Interval after `rating`.
///
/// `repetition_count` is the count of consecutive successes before this
/// rating and `ease_ratio` the ratio before this rating's adjustment.
pub fn next_interval(interval: f64, ease_ratio: f64, repetition_count: u32, rating: Rating) -> f64 {
    if !rating.is_success() {
        return RESET_INTERVAL;
    }
    match repetition_count {
        0 if rating == Rating::VeryGood => FIRST_INTERVAL_VERY_GOOD,
        0 => FIRST_INTERVAL,
        1 => SECOND_INTERVAL,
        _ => interval * ease_ratio,
    }
}
