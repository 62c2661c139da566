//! # Review Pool (Leitner poll)
//!
//! A bounded, per-user rotation of items that are drilled repeatedly before
//! they return to the long-term SM-2 schedule.
//!
//! ## States
//!
//! | State          | Condition                                    | Refresh does        |
//! |----------------|----------------------------------------------|---------------------|
//! | Filling        | size < capacity                              | tops up to capacity |
//! | FullClean      | size == capacity, no purge candidate         | nothing             |
//! | FullPurgeable  | size == capacity, some easy streak ≥ threshold | swaps candidates 1:1 |
//!
//! ## Promotion
//!
//! Each rating climbs `ordinal + 1` levels, so items that are rated poorly
//! climb slower and are served again sooner. Very-good ratings also extend
//! the easy streak that eventually purges the entry.

mod entry;

pub use entry::{PoolEntry, PoolPromotion, PoolSnapshot, PoolState};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::criteria::{rank, Candidate, POLL_FILL_ORDERING, POOL_ORDERING};
use crate::error::{EngineError, Result};
use crate::random::{rng_from_seed, SeedSource};
use crate::sm2::Rating;
use crate::store::{ItemRepository, PoolFilter, PoolRepository, RankQuery};
use crate::types::{Item, ItemId, LanguagePair, UserId};

/// What a refresh changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// State before the refresh
    pub state: PoolState,
    pub added: usize,
    pub removed: usize,
    /// The level ceiling was exceeded and every level was reset
    pub levels_reset: bool,
}

/// Leitner pool service
pub struct ReviewPool {
    items: Arc<dyn ItemRepository>,
    pool: Arc<dyn PoolRepository>,
    config: PoolConfig,
    seeds: Arc<SeedSource>,
}

impl ReviewPool {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        pool: Arc<dyn PoolRepository>,
        config: PoolConfig,
        seeds: Arc<SeedSource>,
    ) -> Self {
        Self {
            items,
            pool,
            config,
            seeds,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Load the pool, purging the oldest overflow first.
    ///
    /// More entries than the capacity can only come from outside writes; the
    /// overflow is purged once and the pool reloaded. Still overflowing after
    /// that is a data inconsistency.
    pub async fn resolve(&self, user: UserId) -> Result<Vec<PoolEntry>> {
        let capacity = self.config.capacity;
        let snapshot = self.pool.load(user, capacity).await?;
        if snapshot.total <= capacity {
            return Ok(snapshot.entries);
        }

        let overflow = snapshot.total - capacity;
        warn!(
            user = %user,
            total = snapshot.total,
            capacity,
            "Review pool over capacity, purging {} oldest entries",
            overflow
        );
        self.pool.purge_oldest(user, overflow).await?;

        let snapshot = self.pool.load(user, capacity).await?;
        if snapshot.total > capacity {
            return Err(EngineError::DataInconsistency(format!(
                "review pool of {} still holds {} entries after purge (capacity {})",
                user, snapshot.total, capacity
            )));
        }
        Ok(snapshot.entries)
    }

    pub async fn state(&self, user: UserId) -> Result<PoolState> {
        let entries = self.resolve(user).await?;
        Ok(PoolState::of(&entries, self.config.capacity))
    }

    /// Replenish or rotate the pool, then apply the level ceiling.
    ///
    /// Additions and removals are persisted in one save.
    pub async fn refresh(
        &self,
        user: UserId,
        languages: &LanguagePair,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome> {
        let entries = self.resolve(user).await?;
        let state = PoolState::of(&entries, self.config.capacity);
        let members: HashSet<ItemId> = entries.iter().map(|e| e.item).collect();

        let (adds, removes) = match state {
            PoolState::Filling => {
                let wanted = self.config.capacity - entries.len();
                let fresh = self.rank_fresh(user, languages, &members, wanted, now).await?;
                let level = self.pool_minimum(entries.iter());
                let adds: Vec<PoolEntry> = fresh
                    .iter()
                    .map(|item| self.new_entry(user, item.id, level, now))
                    .collect();
                (adds, Vec::new())
            }
            PoolState::FullPurgeable => {
                let mut candidates: Vec<&PoolEntry> =
                    entries.iter().filter(|e| e.is_purge_candidate()).collect();
                candidates.sort_by_key(|e| e.last_touched);

                let fresh = self
                    .rank_fresh(user, languages, &members, candidates.len(), now)
                    .await?;
                // candidates without a replacement stay
                let removes: Vec<ItemId> =
                    candidates.iter().take(fresh.len()).map(|e| e.item).collect();
                let level = self.pool_minimum(entries.iter().filter(|e| !removes.contains(&e.item)));
                let adds: Vec<PoolEntry> = fresh
                    .iter()
                    .map(|item| self.new_entry(user, item.id, level, now))
                    .collect();
                (adds, removes)
            }
            PoolState::FullClean => (Vec::new(), Vec::new()),
        };

        if !adds.is_empty() || !removes.is_empty() {
            self.pool.save(user, &adds, &removes).await?;
            debug!(
                user = %user,
                state = %state,
                added = adds.len(),
                removed = removes.len(),
                "Review pool refreshed"
            );
        }

        let levels_reset = self
            .pool
            .reset_if_exceeds(user, self.config.level_ceiling)
            .await?;
        if levels_reset {
            warn!(
                user = %user,
                ceiling = self.config.level_ceiling,
                "Pool level ceiling exceeded, all levels reset to 0"
            );
        }

        Ok(RefreshOutcome {
            state,
            added: adds.len(),
            removed: removes.len(),
            levels_reset,
        })
    }

    /// Up to `limit` pool items, lowest level and least recently touched first.
    ///
    /// Entries whose item no longer exists are dropped from the pool and
    /// skipped; entries in another language pair are skipped.
    pub async fn select_next(
        &self,
        user: UserId,
        languages: &LanguagePair,
        exclude: &HashSet<ItemId>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let entries: Vec<PoolEntry> = self
            .resolve(user)
            .await?
            .into_iter()
            .filter(|e| !exclude.contains(&e.item))
            .collect();
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ItemId> = entries.iter().map(|e| e.item).collect();
        let mut items: HashMap<ItemId, Item> = self
            .items
            .fetch_many(user, &ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let mut dangling = Vec::new();
        let mut candidates = Vec::with_capacity(entries.len());
        for entry in entries {
            match items.remove(&entry.item) {
                Some(item) => candidates.push(Candidate::new(item, None, Some(entry))),
                None => dangling.push(entry.item),
            }
        }
        if !dangling.is_empty() {
            warn!(
                user = %user,
                count = dangling.len(),
                "Pool entries reference deleted items, skipping"
            );
            if let Err(err) = self.pool.save(user, &[], &dangling).await {
                warn!(user = %user, error = %err, "Failed to drop dangling pool entries");
            }
        }

        let mut rng = rng_from_seed(self.seeds.next_seed());
        Ok(rank(candidates, &POOL_ORDERING, now, &mut rng)
            .into_iter()
            .map(|c| c.item)
            .filter(|item| item.languages == *languages)
            .take(limit)
            .collect())
    }

    /// Promotion the pool applies for `rating`
    pub fn promotion_for(&self, rating: Rating, at: DateTime<Utc>) -> PoolPromotion {
        PoolPromotion::for_rating(rating, at)
    }

    /// Apply the promotion rule to `item`; a no-op when it is not pooled
    pub async fn record_rating(
        &self,
        user: UserId,
        item: ItemId,
        rating: Rating,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let promotion = self.promotion_for(rating, at);
        self.pool
            .bulk_level_increment(user, &[item], &promotion)
            .await?;
        Ok(())
    }

    /// Drop the whole pool of `user`
    pub async fn clear(&self, user: UserId) -> Result<()> {
        self.pool.delete_all(user).await?;
        Ok(())
    }

    async fn rank_fresh(
        &self,
        user: UserId,
        languages: &LanguagePair,
        members: &HashSet<ItemId>,
        wanted: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        if wanted == 0 {
            return Ok(Vec::new());
        }
        let query = RankQuery {
            user,
            limit: wanted,
            exclude: members.clone(),
            criteria: POLL_FILL_ORDERING.to_vec(),
            pool_filter: PoolFilter::NotInPool,
            deck: None,
            languages: languages.clone(),
            now,
            seed: self.seeds.next_seed(),
        };
        let mut fresh = self.items.ranked_fetch(&query).await?;
        fresh.truncate(wanted);
        Ok(fresh)
    }

    fn pool_minimum<'a>(&self, entries: impl Iterator<Item = &'a PoolEntry>) -> u32 {
        entries.map(|e| e.level).min().unwrap_or(self.config.min_level)
    }

    fn new_entry(&self, user: UserId, item: ItemId, level: u32, now: DateTime<Utc>) -> PoolEntry {
        PoolEntry::new(
            user,
            item,
            level,
            self.config.easy_streak_purge_threshold,
            now,
        )
    }
}
