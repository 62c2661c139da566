//! Test Store Manager
//!
//! Provides isolated engine instances for testing:
//! - A fresh in-memory store per manager
//! - A seeded engine so orderings are reproducible
//! - Seeding helpers for decks and users
//! - Tracing output routed through the test writer

use std::sync::{Arc, Once};

use cadence_core::{
    DeckId, Engine, EngineConfig, ExerciseBuilder, ItemId, LanguagePair, MemoryStore, PoolEntry,
    Repositories, SessionKind, SessionRequest, SessionState, UserId,
};
use tracing_subscriber::EnvFilter;

use crate::mocks::{RecordingExerciseBuilder, TestDataFactory};

/// Seed used by every manager unless a test overrides it
pub const TEST_SEED: u64 = 0x5EED;

static TRACING: Once = Once::new();

/// Install a `RUST_LOG`-driven subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Manager for test engines
///
/// # Example
///
/// ```rust,ignore
/// let t = TestStoreManager::new();
/// let (deck, items) = t.seed_deck(t.user, 10);
/// let session = t.engine.start_session(t.deck_request(deck, 5)).await?;
/// ```
pub struct TestStoreManager {
    /// The backing store, for seeding and inspection
    pub store: Arc<MemoryStore>,
    /// Engine wired to `store`
    pub engine: Engine,
    /// Exercise builder the engine was given
    pub exercises: Arc<RecordingExerciseBuilder>,
    /// Default learner
    pub user: UserId,
}

impl TestStoreManager {
    /// Seeded engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig {
            seed: Some(TEST_SEED),
            ..EngineConfig::default()
        })
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_builder(Arc::new(RecordingExerciseBuilder::new()), config)
    }

    pub fn with_builder(exercises: Arc<RecordingExerciseBuilder>, config: EngineConfig) -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let builder: Arc<dyn ExerciseBuilder> = exercises.clone();
        let engine = Engine::new(Repositories::from_store(store.clone()), builder, config)
            .expect("test config must validate");
        Self {
            store,
            engine,
            exercises,
            user: UserId::new(),
        }
    }

    pub fn languages() -> LanguagePair {
        LanguagePair::new("uk", "en")
    }

    // ========================================================================
    // SEEDING
    // ========================================================================

    /// Create a deck of `count` items for `user`
    pub fn seed_deck(&self, user: UserId, count: usize) -> (DeckId, Vec<ItemId>) {
        TestDataFactory::create_deck(&self.store, user, count)
    }

    /// Place `items` in the pool of `user` at `level`
    pub fn seed_pool(&self, user: UserId, items: &[ItemId], level: u32) {
        let threshold = self.engine.config().pool.easy_streak_purge_threshold;
        for item in items {
            self.store.insert_pool_entry(PoolEntry::new(
                user,
                *item,
                level,
                threshold,
                chrono::Utc::now(),
            ));
        }
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    pub fn deck_request(&self, deck: DeckId, size: u32) -> SessionRequest {
        SessionRequest {
            user: self.user,
            kind: SessionKind::Single(cadence_core::ExerciseType::Plain),
            deck: Some(deck),
            languages: Self::languages(),
            size: Some(size),
        }
    }

    pub fn pool_request(&self, kind: SessionKind, size: u32) -> SessionRequest {
        SessionRequest {
            user: self.user,
            kind,
            deck: None,
            languages: Self::languages(),
            size: Some(size),
        }
    }

    /// Advance once and rate the newest pending item with `rating`.
    ///
    /// Returns the rated item, or `None` when nothing could be served.
    pub async fn serve_and_rate(
        &self,
        session: &SessionState,
        rating: cadence_core::Rating,
    ) -> Option<ItemId> {
        let advanced = self
            .engine
            .advance(session.id, chrono::Utc::now())
            .await
            .expect("advance");
        let item = *advanced.pending_ids().last()?;
        self.engine
            .rate(session.id, item, rating, chrono::Utc::now())
            .await
            .expect("rate");
        Some(item)
    }

    pub fn pool_size(&self, user: UserId) -> usize {
        self.store.pool_entries(user).len()
    }
}

impl Default for TestStoreManager {
    fn default() -> Self {
        Self::new()
    }
}
