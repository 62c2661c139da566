//! Repository Contracts
//!
//! The engine reads and writes scheduling state only through these traits.
//! Implementations must serialize writes per (user, item): difficulty
//! records carry a `version` and stale saves fail with
//! [`StoreError::Conflict`], which the engine answers with one fresh read
//! and retry.
//!
//! [`memory::MemoryStore`] is the reference implementation.

pub mod memory;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::criteria::SortCriterion;
use crate::pool::{PoolEntry, PoolPromotion, PoolSnapshot};
use crate::session::SessionState;
use crate::sm2::DifficultyRecord;
use crate::types::{DeckId, Item, ItemId, LanguagePair, SessionId, UserId};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Store error type
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Optimistic version check failed
    #[error("Version conflict on {entity} {key}")]
    Conflict { entity: &'static str, key: String },
    /// Backend failure
    #[error("Backend error: {0}")]
    Backend(String),
    /// A lock was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Store result type
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// QUERIES AND COMMITS
// ============================================================================

/// Restricts a ranked fetch by pool membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolFilter {
    #[default]
    Any,
    InPool,
    NotInPool,
}

/// Arguments of [`ItemRepository::ranked_fetch`]
#[derive(Debug, Clone)]
pub struct RankQuery {
    pub user: UserId,
    pub limit: usize,
    pub exclude: HashSet<ItemId>,
    pub criteria: Vec<SortCriterion>,
    pub pool_filter: PoolFilter,
    /// Restrict to one deck; all of the user's items when `None`
    pub deck: Option<DeckId>,
    pub languages: LanguagePair,
    pub now: DateTime<Utc>,
    /// Seed for the random criteria and tie-breaks
    pub seed: u64,
}

/// One rating's writes, applied together or not at all
#[derive(Debug, Clone)]
pub struct RatingCommit {
    /// Record to persist; its `version` is the version that was read
    pub record: DifficultyRecord,
    pub promotion: PoolPromotion,
}

// ============================================================================
// REPOSITORIES
// ============================================================================

/// Item lookups and ranked candidate fetches
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Items with the given ids; missing ids are left out
    async fn fetch_many(&self, user: UserId, ids: &[ItemId]) -> StoreResult<Vec<Item>>;

    /// Up to `limit` random items of `deck` (or any deck) not in `exclude`
    async fn fetch_random(
        &self,
        user: UserId,
        deck: Option<DeckId>,
        languages: &LanguagePair,
        exclude: &HashSet<ItemId>,
        limit: usize,
        seed: u64,
    ) -> StoreResult<Vec<Item>>;

    /// Up to `query.limit` items ordered by `query.criteria`
    async fn ranked_fetch(&self, query: &RankQuery) -> StoreResult<Vec<Item>>;
}

/// SM-2 records
#[async_trait]
pub trait DifficultyRepository: Send + Sync {
    /// Stored records for `items`; unrated items have none
    async fn find_many(&self, user: UserId, items: &[ItemId]) -> StoreResult<Vec<DifficultyRecord>>;

    /// Upsert with a version check per record
    async fn save_many(&self, records: &[DifficultyRecord]) -> StoreResult<()>;

    /// Zero `session_repetitions` on every record of `user`
    async fn reset_session_repetitions(&self, user: UserId) -> StoreResult<()>;
}

/// Leitner pool entries
#[async_trait]
pub trait PoolRepository: Send + Sync {
    /// Load at most `limit` entries along with the real stored count
    async fn load(&self, user: UserId, limit: usize) -> StoreResult<PoolSnapshot>;

    /// Remove the `count` least recently touched entries
    async fn purge_oldest(&self, user: UserId, count: usize) -> StoreResult<()>;

    /// Insert `adds` and delete `removes` as one write
    async fn save(&self, user: UserId, adds: &[PoolEntry], removes: &[ItemId]) -> StoreResult<()>;

    /// Apply `promotion` (level delta, easy streak, touch time) to each
    /// listed entry; items outside the pool are skipped
    async fn bulk_level_increment(
        &self,
        user: UserId,
        items: &[ItemId],
        promotion: &PoolPromotion,
    ) -> StoreResult<()>;

    /// Reset every level of `user` to 0 if any exceeds `ceiling`.
    /// Returns whether a reset happened.
    async fn reset_if_exceeds(&self, user: UserId, ceiling: u32) -> StoreResult<bool>;

    async fn delete_all(&self, user: UserId) -> StoreResult<()>;
}

/// Learning sessions
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &SessionState) -> StoreResult<()>;

    async fn find(&self, id: SessionId) -> StoreResult<Option<SessionState>>;

    /// Persist with a version check; the stored version is bumped
    async fn save(&self, session: &SessionState) -> StoreResult<()>;

    /// Mark every open session of `user` finished
    async fn mark_all_finished(&self, user: UserId) -> StoreResult<()>;
}

/// Transaction boundary for a rating
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Persist the difficulty record and apply the pool promotion atomically.
    ///
    /// Fails with [`StoreError::Conflict`] when the stored record's version
    /// differs from `commit.record.version`; nothing is written then.
    async fn commit_rating(&self, commit: &RatingCommit) -> StoreResult<()>;
}

/// Shared handles to every repository the engine needs
#[derive(Clone)]
pub struct Repositories {
    pub items: Arc<dyn ItemRepository>,
    pub difficulty: Arc<dyn DifficultyRepository>,
    pub pool: Arc<dyn PoolRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub ratings: Arc<dyn RatingStore>,
}

impl Repositories {
    /// Use one backend for every repository
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ItemRepository
            + DifficultyRepository
            + PoolRepository
            + SessionRepository
            + RatingStore
            + 'static,
    {
        Self {
            items: store.clone(),
            difficulty: store.clone(),
            pool: store.clone(),
            sessions: store.clone(),
            ratings: store,
        }
    }
}
