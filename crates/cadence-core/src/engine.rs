//! Engine facade
//!
//! Wires every component from one set of repositories, one configuration
//! and one shared random source.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::pool::ReviewPool;
use crate::random::SeedSource;
use crate::repetition::RepetitionOrchestrator;
use crate::selector::ItemSelector;
use crate::session::{ExerciseBuilder, SessionProgress, SessionRequest, SessionState};
use crate::sm2::{DifficultyRecord, Rating};
use crate::store::Repositories;
use crate::types::{ItemId, SessionId, UserId};

/// The scheduling engine
pub struct Engine {
    config: EngineConfig,
    pool: Arc<ReviewPool>,
    selector: Arc<ItemSelector>,
    orchestrator: Arc<RepetitionOrchestrator>,
    sessions: SessionProgress,
}

impl Engine {
    /// Build an engine; fails when `config` does not validate
    pub fn new(
        repos: Repositories,
        exercises: Arc<dyn ExerciseBuilder>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let seeds = Arc::new(SeedSource::from_config(config.seed));

        let pool = Arc::new(ReviewPool::new(
            repos.items.clone(),
            repos.pool.clone(),
            config.pool.clone(),
            seeds.clone(),
        ));
        let selector = Arc::new(ItemSelector::new(
            repos.items.clone(),
            pool.clone(),
            config.selector.clone(),
            seeds.clone(),
        ));
        let orchestrator = Arc::new(RepetitionOrchestrator::new(
            repos.difficulty.clone(),
            repos.ratings.clone(),
            pool.clone(),
        ));
        let sessions = SessionProgress::new(
            repos.sessions.clone(),
            repos.difficulty.clone(),
            pool.clone(),
            selector.clone(),
            orchestrator.clone(),
            exercises,
            seeds,
            config.session.clone(),
        );

        Ok(Self {
            config,
            pool,
            selector,
            orchestrator,
            sessions,
        })
    }

    pub async fn start_session(&self, request: SessionRequest) -> Result<SessionState> {
        self.sessions.start(request).await
    }

    pub async fn advance(&self, session: SessionId, now: DateTime<Utc>) -> Result<SessionState> {
        self.sessions.advance(session, now).await
    }

    pub async fn rate(
        &self,
        session: SessionId,
        item: ItemId,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<SessionState> {
        self.sessions.rate(session, item, rating, now).await
    }

    pub async fn session(&self, session: SessionId) -> Result<SessionState> {
        self.sessions.session(session).await
    }

    /// Rate an item outside any session
    pub async fn rate_item(
        &self,
        user: UserId,
        item: ItemId,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<DifficultyRecord> {
        self.orchestrator.handle(user, item, rating, now).await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &ReviewPool {
        &self.pool
    }

    pub fn selector(&self) -> &ItemSelector {
        &self.selector
    }

    pub fn sessions(&self) -> &SessionProgress {
        &self.sessions
    }
}
