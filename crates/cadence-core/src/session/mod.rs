//! # Learning Sessions
//!
//! A session is a bounded run of item presentations. It accepts a new item
//! only while fewer than [`UNRATED_LIMIT`] served items await a rating and
//! the size limit is not reached, and it finishes once as many items were
//! rated as the size limit allows.
//!
//! Sessions bound to a deck select from that deck; sessions without one
//! work from the user's review pool.

mod exercise;
mod progress;
mod state;

pub use exercise::{attach_exercise, exercise_type_for, ExerciseBuilder, PlainOnly};
pub use progress::{SessionProgress, SessionRequest};
pub use state::{
    Exercise, ExerciseType, SessionItem, SessionKind, SessionState, SessionStatus, UNRATED_LIMIT,
};
