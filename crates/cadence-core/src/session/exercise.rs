//! Exercise resolution for the next served item.

use async_trait::async_trait;

use super::state::{Exercise, ExerciseType, SessionKind};
use crate::error::Result;
use crate::random::SeedSource;
use crate::sm2::Rating;
use crate::store::StoreResult;
use crate::types::{ExerciseId, Item, UserId};

/// Materializes exercises (unscramble puzzles, word-match sets) for items.
///
/// Implementations live outside the engine. `Ok(None)` means no exercise
/// could be produced and the item is served plain.
#[async_trait]
pub trait ExerciseBuilder: Send + Sync {
    async fn build(
        &self,
        user: UserId,
        item: &Item,
        exercise_type: ExerciseType,
    ) -> StoreResult<Option<ExerciseId>>;
}

/// Builder that never produces an exercise
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainOnly;

#[async_trait]
impl ExerciseBuilder for PlainOnly {
    async fn build(&self, _: UserId, _: &Item, _: ExerciseType) -> StoreResult<Option<ExerciseId>> {
        Ok(None)
    }
}

/// Exercise type for the next item.
///
/// Single-mode sessions always use their type. Mixed sessions draw
/// uniformly, but only attach an exercise when the item's last rating was
/// at least good; otherwise the item is served plain.
pub fn exercise_type_for(
    kind: SessionKind,
    last_rating: Option<Rating>,
    seeds: &SeedSource,
) -> ExerciseType {
    match kind {
        SessionKind::Single(exercise_type) => exercise_type,
        SessionKind::Mixed => {
            let drawn = seeds
                .pick(&ExerciseType::MIXED)
                .unwrap_or(ExerciseType::Plain);
            if last_rating.is_some_and(Rating::is_success) {
                drawn
            } else {
                ExerciseType::Plain
            }
        }
    }
}

/// Build the exercise of `exercise_type` for `item`
pub async fn attach_exercise(
    builder: &dyn ExerciseBuilder,
    user: UserId,
    item: &Item,
    exercise_type: ExerciseType,
) -> Result<Exercise> {
    let exercise = match exercise_type {
        ExerciseType::Plain => Exercise::Plain,
        ExerciseType::Unscramble => match builder.build(user, item, exercise_type).await? {
            Some(id) => Exercise::Unscramble { id },
            None => Exercise::Plain,
        },
        ExerciseType::WordMatch => match builder.build(user, item, exercise_type).await? {
            Some(id) => Exercise::WordMatch { id },
            None => Exercise::Plain,
        },
    };
    Ok(exercise)
}
