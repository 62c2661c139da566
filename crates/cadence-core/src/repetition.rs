//! Rating orchestration
//!
//! Turns one answer into the SM-2 update and the pool promotion. Both are
//! handed to [`RatingStore::commit_rating`] as a single commit, so a rating
//! is either fully applied or not at all.
//!
//! The read-modify-write is optimistic: when the store reports a version
//! conflict the record is read again and the update recomputed once. A
//! second conflict is returned as [`EngineError::Conflict`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::pool::ReviewPool;
use crate::sm2::{DifficultyModel, DifficultyRecord, Rating};
use crate::store::{DifficultyRepository, RatingCommit, RatingStore, StoreError};
use crate::types::{ItemId, UserId};

/// Applies ratings to the difficulty model and the review pool
pub struct RepetitionOrchestrator {
    difficulty: Arc<dyn DifficultyRepository>,
    ratings: Arc<dyn RatingStore>,
    pool: Arc<ReviewPool>,
}

impl RepetitionOrchestrator {
    pub fn new(
        difficulty: Arc<dyn DifficultyRepository>,
        ratings: Arc<dyn RatingStore>,
        pool: Arc<ReviewPool>,
    ) -> Self {
        Self {
            difficulty,
            ratings,
            pool,
        }
    }

    /// Record `rating` for `item` and return the stored record
    pub async fn handle(
        &self,
        user: UserId,
        item: ItemId,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<DifficultyRecord> {
        let mut retried = false;
        loop {
            let current = self.load(user, item).await?;
            let mut next = DifficultyModel::apply(&current, rating);
            next.updated_at = Some(now);

            let commit = RatingCommit {
                record: next.clone(),
                promotion: self.pool.promotion_for(rating, now),
            };
            match self.ratings.commit_rating(&commit).await {
                Ok(()) => {
                    next.version += 1;
                    debug!(
                        user = %user,
                        item = %item,
                        rating = %rating,
                        interval = next.interval,
                        ease_ratio = next.ease_ratio,
                        "Rating applied"
                    );
                    return Ok(next);
                }
                Err(StoreError::Conflict { .. }) if !retried => {
                    warn!(user = %user, item = %item, "Concurrent rating, retrying from a fresh read");
                    retried = true;
                }
                Err(StoreError::Conflict { entity, key }) => {
                    return Err(EngineError::Conflict(format!("{} {}", entity, key)));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Stored record, or a fresh one for a first rating
    async fn load(&self, user: UserId, item: ItemId) -> Result<DifficultyRecord> {
        let found = self.difficulty.find_many(user, &[item]).await?;
        Ok(found
            .into_iter()
            .find(|r| r.item == item)
            .unwrap_or_else(|| DifficultyRecord::new(user, item)))
    }
}
