//! In-memory store
//!
//! Reference implementation of every repository trait. All state sits
//! behind one mutex, which makes each trait call atomic and gives
//! `commit_rating` its all-or-nothing behavior.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rand::seq::SliceRandom;

use super::{
    DifficultyRepository, ItemRepository, PoolFilter, PoolRepository, RankQuery, RatingCommit,
    RatingStore, SessionRepository, StoreError, StoreResult,
};
use crate::criteria::{rank, Candidate};
use crate::pool::{PoolEntry, PoolPromotion, PoolSnapshot};
use crate::random::rng_from_seed;
use crate::session::SessionState;
use crate::sm2::{DifficultyModel, DifficultyRecord};
use crate::types::{DeckId, Item, ItemId, LanguagePair, SessionId, UserId};

type Key = (UserId, ItemId);

/// One-shot failures for exercising error paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Pool half of `commit_rating`, after the difficulty half was written
    RatingPoolWrite,
    /// `commit_rating` reports a version conflict
    RatingConflict,
    /// `PoolRepository::save`
    PoolSave,
    /// `SessionRepository::save`
    SessionSave,
}

#[derive(Default)]
struct Inner {
    items: HashMap<ItemId, Item>,
    difficulty: HashMap<Key, DifficultyRecord>,
    pool: HashMap<Key, PoolEntry>,
    sessions: HashMap<SessionId, SessionState>,
    failures: HashSet<FailPoint>,
}

impl Inner {
    fn take_failure(&mut self, point: FailPoint) -> bool {
        self.failures.remove(&point)
    }

    fn candidates(
        &self,
        user: UserId,
        deck: Option<DeckId>,
        languages: &LanguagePair,
        exclude: &HashSet<ItemId>,
    ) -> Vec<&Item> {
        let mut items: Vec<&Item> = self
            .items
            .values()
            .filter(|i| i.owner == user)
            .filter(|i| i.languages == *languages)
            .filter(|i| deck.is_none_or(|d| i.deck == d))
            .filter(|i| !exclude.contains(&i.id))
            .collect();
        // map order is arbitrary; seeded draws need a stable input order
        items.sort_by_key(|i| i.id);
        items
    }

    fn user_pool(&self, user: UserId) -> Vec<&PoolEntry> {
        let mut entries: Vec<&PoolEntry> = self.pool.values().filter(|e| e.user == user).collect();
        entries.sort_by(|a, b| {
            a.last_touched
                .cmp(&b.last_touched)
                .then(a.item.cmp(&b.item))
        });
        entries
    }
}

/// Store holding everything in process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::LockPoisoned("memory store".into()))
    }

    fn lock_or_recover(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // SEEDING AND INSPECTION
    // ========================================================================

    pub fn insert_item(&self, item: Item) {
        self.lock_or_recover().items.insert(item.id, item);
    }

    /// Delete an item and cascade to its records and pool entries
    pub fn delete_item(&self, item: ItemId) {
        let mut inner = self.lock_or_recover();
        inner.items.remove(&item);
        inner.difficulty.retain(|(_, i), _| *i != item);
        inner.pool.retain(|(_, i), _| *i != item);
    }

    /// Delete an item but leave its pool entries dangling
    pub fn remove_item_only(&self, item: ItemId) {
        self.lock_or_recover().items.remove(&item);
    }

    /// Delete everything a user owns
    pub fn delete_user(&self, user: UserId) {
        let mut inner = self.lock_or_recover();
        inner.items.retain(|_, i| i.owner != user);
        inner.difficulty.retain(|(u, _), _| *u != user);
        inner.pool.retain(|(u, _), _| *u != user);
        inner.sessions.retain(|_, s| s.owner != user);
    }

    /// Store a pool entry without any capacity check
    pub fn insert_pool_entry(&self, entry: PoolEntry) {
        self.lock_or_recover()
            .pool
            .insert((entry.user, entry.item), entry);
    }

    /// Store a difficulty record as-is, bumping its version
    pub fn put_record(&self, mut record: DifficultyRecord) {
        record.version += 1;
        self.lock_or_recover()
            .difficulty
            .insert((record.user, record.item), record);
    }

    pub fn record(&self, user: UserId, item: ItemId) -> Option<DifficultyRecord> {
        self.lock_or_recover().difficulty.get(&(user, item)).cloned()
    }

    /// Pool entries of `user`, least recently touched first
    pub fn pool_entries(&self, user: UserId) -> Vec<PoolEntry> {
        self.lock_or_recover()
            .user_pool(user)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn session(&self, id: SessionId) -> Option<SessionState> {
        self.lock_or_recover().sessions.get(&id).cloned()
    }

    pub fn sessions_of(&self, user: UserId) -> Vec<SessionState> {
        self.lock_or_recover()
            .sessions
            .values()
            .filter(|s| s.owner == user)
            .cloned()
            .collect()
    }

    /// Make the next call through `point` fail
    pub fn fail_next(&self, point: FailPoint) {
        self.lock_or_recover().failures.insert(point);
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn fetch_many(&self, user: UserId, ids: &[ItemId]) -> StoreResult<Vec<Item>> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.items.get(id))
            .filter(|item| item.owner == user)
            .cloned()
            .collect())
    }

    async fn fetch_random(
        &self,
        user: UserId,
        deck: Option<DeckId>,
        languages: &LanguagePair,
        exclude: &HashSet<ItemId>,
        limit: usize,
        seed: u64,
    ) -> StoreResult<Vec<Item>> {
        let inner = self.lock()?;
        let mut items = inner.candidates(user, deck, languages, exclude);
        items.shuffle(&mut rng_from_seed(seed));
        Ok(items.into_iter().take(limit).cloned().collect())
    }

    async fn ranked_fetch(&self, query: &RankQuery) -> StoreResult<Vec<Item>> {
        let inner = self.lock()?;
        let candidates: Vec<Candidate> = inner
            .candidates(query.user, query.deck, &query.languages, &query.exclude)
            .into_iter()
            .filter(|item| {
                let pooled = inner.pool.contains_key(&(query.user, item.id));
                match query.pool_filter {
                    PoolFilter::Any => true,
                    PoolFilter::InPool => pooled,
                    PoolFilter::NotInPool => !pooled,
                }
            })
            .map(|item| {
                let key = (query.user, item.id);
                Candidate::new(
                    item.clone(),
                    inner.difficulty.get(&key).cloned(),
                    inner.pool.get(&key).cloned(),
                )
            })
            .collect();

        let mut rng = rng_from_seed(query.seed);
        Ok(rank(candidates, &query.criteria, query.now, &mut rng)
            .into_iter()
            .take(query.limit)
            .map(|c| c.item)
            .collect())
    }
}

#[async_trait]
impl DifficultyRepository for MemoryStore {
    async fn find_many(&self, user: UserId, items: &[ItemId]) -> StoreResult<Vec<DifficultyRecord>> {
        let inner = self.lock()?;
        Ok(items
            .iter()
            .filter_map(|item| inner.difficulty.get(&(user, *item)))
            .cloned()
            .collect())
    }

    async fn save_many(&self, records: &[DifficultyRecord]) -> StoreResult<()> {
        let mut inner = self.lock()?;
        for record in records {
            let stored = inner
                .difficulty
                .get(&(record.user, record.item))
                .map_or(0, |r| r.version);
            if stored != record.version {
                return Err(conflict("difficulty", record.user, record.item));
            }
        }
        for record in records {
            let mut next = record.clone();
            next.version += 1;
            inner.difficulty.insert((record.user, record.item), next);
        }
        Ok(())
    }

    async fn reset_session_repetitions(&self, user: UserId) -> StoreResult<()> {
        let mut inner = self.lock()?;
        for record in inner.difficulty.values_mut().filter(|r| r.user == user) {
            *record = DifficultyModel::reset_session(record);
        }
        Ok(())
    }
}

#[async_trait]
impl PoolRepository for MemoryStore {
    async fn load(&self, user: UserId, limit: usize) -> StoreResult<PoolSnapshot> {
        let inner = self.lock()?;
        let entries = inner.user_pool(user);
        Ok(PoolSnapshot {
            total: entries.len(),
            entries: entries.into_iter().take(limit).cloned().collect(),
        })
    }

    async fn purge_oldest(&self, user: UserId, count: usize) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let oldest: Vec<ItemId> = inner
            .user_pool(user)
            .into_iter()
            .take(count)
            .map(|e| e.item)
            .collect();
        for item in oldest {
            inner.pool.remove(&(user, item));
        }
        Ok(())
    }

    async fn save(&self, user: UserId, adds: &[PoolEntry], removes: &[ItemId]) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.take_failure(FailPoint::PoolSave) {
            return Err(StoreError::Backend("pool save failed".into()));
        }
        for item in removes {
            inner.pool.remove(&(user, *item));
        }
        for entry in adds {
            inner.pool.insert((user, entry.item), entry.clone());
        }
        Ok(())
    }

    async fn bulk_level_increment(
        &self,
        user: UserId,
        items: &[ItemId],
        promotion: &PoolPromotion,
    ) -> StoreResult<()> {
        let mut inner = self.lock()?;
        for item in items {
            if let Some(entry) = inner.pool.get_mut(&(user, *item)) {
                entry.promote(promotion);
            }
        }
        Ok(())
    }

    async fn reset_if_exceeds(&self, user: UserId, ceiling: u32) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let exceeded = inner
            .pool
            .values()
            .any(|e| e.user == user && e.level > ceiling);
        if exceeded {
            for entry in inner.pool.values_mut().filter(|e| e.user == user) {
                entry.level = 0;
            }
        }
        Ok(exceeded)
    }

    async fn delete_all(&self, user: UserId) -> StoreResult<()> {
        self.lock()?.pool.retain(|(u, _), _| *u != user);
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, session: &SessionState) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let mut stored = session.clone();
        stored.version = 1;
        inner.sessions.insert(session.id, stored);
        Ok(())
    }

    async fn find(&self, id: SessionId) -> StoreResult<Option<SessionState>> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn save(&self, session: &SessionState) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.take_failure(FailPoint::SessionSave) {
            return Err(StoreError::Backend("session save failed".into()));
        }
        let stored = inner
            .sessions
            .get(&session.id)
            .ok_or_else(|| StoreError::NotFound(format!("session {}", session.id)))?;
        if stored.version != session.version {
            return Err(StoreError::Conflict {
                entity: "session",
                key: session.id.to_string(),
            });
        }
        let mut next = session.clone();
        next.version += 1;
        inner.sessions.insert(session.id, next);
        Ok(())
    }

    async fn mark_all_finished(&self, user: UserId) -> StoreResult<()> {
        let mut inner = self.lock()?;
        for session in inner
            .sessions
            .values_mut()
            .filter(|s| s.owner == user && !s.finished)
        {
            session.finished = true;
            session.version += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn commit_rating(&self, commit: &RatingCommit) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let record = &commit.record;
        let key = (record.user, record.item);

        if inner.take_failure(FailPoint::RatingConflict) {
            return Err(conflict("difficulty", record.user, record.item));
        }
        let stored_version = inner.difficulty.get(&key).map_or(0, |r| r.version);
        if stored_version != record.version {
            return Err(conflict("difficulty", record.user, record.item));
        }

        let mut next = record.clone();
        next.version += 1;
        let previous = inner.difficulty.insert(key, next);

        if inner.take_failure(FailPoint::RatingPoolWrite) {
            // roll the difficulty half back
            match previous {
                Some(previous) => inner.difficulty.insert(key, previous),
                None => inner.difficulty.remove(&key),
            };
            return Err(StoreError::Backend("pool promotion failed".into()));
        }

        if let Some(entry) = inner.pool.get_mut(&key) {
            entry.promote(&commit.promotion);
        }
        Ok(())
    }
}

fn conflict(entity: &'static str, user: UserId, item: ItemId) -> StoreError {
    StoreError::Conflict {
        entity,
        key: format!("{}/{}", user, item),
    }
}
