//! Session progress: starting, advancing and rating.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::exercise::{attach_exercise, exercise_type_for, ExerciseBuilder};
use super::state::{SessionKind, SessionState};
use crate::config::SessionConfig;
use crate::error::{EngineError, Result};
use crate::pool::ReviewPool;
use crate::random::SeedSource;
use crate::repetition::RepetitionOrchestrator;
use crate::selector::{ItemSelector, SelectionContext};
use crate::sm2::Rating;
use crate::store::{DifficultyRepository, SessionRepository, StoreError};
use crate::types::{DeckId, ItemId, LanguagePair, SessionId, UserId};

/// Options for a new session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub user: UserId,
    pub kind: SessionKind,
    /// Bind the session to a deck; pool mode when `None`
    pub deck: Option<DeckId>,
    pub languages: LanguagePair,
    /// Session size; the configured default when `None`
    pub size: Option<u32>,
}

/// Session state machine service
pub struct SessionProgress {
    sessions: Arc<dyn SessionRepository>,
    difficulty: Arc<dyn DifficultyRepository>,
    pool: Arc<ReviewPool>,
    selector: Arc<ItemSelector>,
    orchestrator: Arc<RepetitionOrchestrator>,
    exercises: Arc<dyn ExerciseBuilder>,
    seeds: Arc<SeedSource>,
    config: SessionConfig,
}

impl SessionProgress {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        difficulty: Arc<dyn DifficultyRepository>,
        pool: Arc<ReviewPool>,
        selector: Arc<ItemSelector>,
        orchestrator: Arc<RepetitionOrchestrator>,
        exercises: Arc<dyn ExerciseBuilder>,
        seeds: Arc<SeedSource>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            difficulty,
            pool,
            selector,
            orchestrator,
            exercises,
            seeds,
            config,
        }
    }

    /// Start a session, closing any session the user still has open
    pub async fn start(&self, request: SessionRequest) -> Result<SessionState> {
        self.sessions.mark_all_finished(request.user).await?;
        self.difficulty
            .reset_session_repetitions(request.user)
            .await?;

        let mut session = SessionState::new(
            request.user,
            request.kind,
            request.deck,
            request.languages,
            request.size.unwrap_or(self.config.default_size),
        );
        self.sessions.create(&session).await?;
        session.version = 1;

        info!(
            session = %session.id,
            user = %session.owner,
            size = session.size_limit,
            pool = session.uses_pool(),
            "Session started"
        );
        Ok(session)
    }

    pub async fn session(&self, id: SessionId) -> Result<SessionState> {
        self.sessions
            .find(id)
            .await?
            .ok_or_else(|| EngineError::not_found("session", id))
    }

    /// Queue the next item.
    ///
    /// Returns the session unchanged when it cannot take another item (too
    /// many unrated, size reached, finished) or nothing is left to serve.
    pub async fn advance(&self, id: SessionId, now: DateTime<Utc>) -> Result<SessionState> {
        let mut session = self.session(id).await?;
        if !session.can_accept_next() {
            debug!(
                session = %id,
                unrated = session.unrated_item_count(),
                served = session.current_item_count(),
                "Session cannot accept another item"
            );
            return Ok(session);
        }

        if session.uses_pool() {
            self.pool
                .refresh(session.owner, &session.languages, now)
                .await?;
        }

        let ctx = SelectionContext::from_session(&session);
        let pending: HashSet<ItemId> = session.pending_ids().into_iter().collect();
        let next = self
            .selector
            .select(&ctx, 1, &session.languages, &pending, now)
            .await?
            .into_iter()
            .next();
        let Some(item) = next else {
            debug!(session = %id, "No item available to serve");
            return Ok(session);
        };

        let last_rating = self
            .difficulty
            .find_many(session.owner, &[item.id])
            .await?
            .into_iter()
            .find_map(|r| r.last_rating);
        let exercise_type = exercise_type_for(session.kind, last_rating, &self.seeds);
        let exercise =
            attach_exercise(self.exercises.as_ref(), session.owner, &item, exercise_type).await?;

        let mut retried = false;
        loop {
            if !session.push(item.id, exercise) {
                debug!(session = %id, item = %item.id, "Session filled up meanwhile, item dropped");
                return Ok(session);
            }
            match self.sessions.save(&session).await {
                Ok(()) => break,
                Err(StoreError::Conflict { .. }) if !retried => {
                    warn!(session = %id, "Concurrent session update, retrying from a fresh read");
                    retried = true;
                    session = self.session(id).await?;
                    if session.pending_ids().contains(&item.id) {
                        return Ok(session);
                    }
                }
                Err(err) => return Err(conflict(err)),
            }
        }
        session.version += 1;

        debug!(
            session = %id,
            item = %item.id,
            exercise = %exercise.exercise_type(),
            "Item queued"
        );
        Ok(session)
    }

    /// Rate a served item.
    ///
    /// Validation failures change nothing. The session mark is saved first;
    /// if applying the rating then fails, the mark is reverted. A revert that
    /// cannot be saved is returned as the error.
    pub async fn rate(
        &self,
        id: SessionId,
        item: ItemId,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<SessionState> {
        let mut retried = false;
        let (slot, finishes, mut marked) = loop {
            let before = self.session(id).await?;
            let mut marked = before.clone();
            marked.mark_rated(item, rating)?;
            let slot = before
                .unrated_slot(item)
                .ok_or_else(|| EngineError::not_found("session item", item))?;
            match self.sessions.save(&marked).await {
                Ok(()) => break (slot, marked.finished && !before.finished, marked),
                Err(StoreError::Conflict { .. }) if !retried => {
                    warn!(session = %id, "Concurrent session update, retrying from a fresh read");
                    retried = true;
                }
                Err(err) => return Err(conflict(err)),
            }
        };
        marked.version += 1;

        if let Err(err) = self
            .orchestrator
            .handle(marked.owner, item, rating, now)
            .await
        {
            warn!(session = %id, item = %item, error = %err, "Rating failed, reverting session mark");
            self.revert_mark(id, slot, item, finishes).await?;
            return Err(err);
        }

        if marked.finished {
            info!(session = %id, rated = marked.rated_item_count(), "Session finished");
        }
        Ok(marked)
    }

    /// Clear the mark left in `slot` on the current stored session, keeping
    /// whatever else was saved since. Reopens the session when the mark was
    /// what finished it.
    async fn revert_mark(&self, id: SessionId, slot: usize, item: ItemId, reopen: bool) -> Result<()> {
        let mut retried = false;
        loop {
            let mut session = self.session(id).await?;
            if !session.clear_rating(slot, item) {
                return Ok(());
            }
            if reopen {
                session.finished = false;
            }
            match self.sessions.save(&session).await {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict { .. }) if !retried => {
                    warn!(session = %id, "Concurrent session update while reverting, retrying");
                    retried = true;
                }
                Err(err) => {
                    warn!(session = %id, error = %err, "Failed to revert session mark");
                    return Err(conflict(err));
                }
            }
        }
    }
}

fn conflict(err: StoreError) -> EngineError {
    match err {
        StoreError::Conflict { entity, key } => EngineError::Conflict(format!("{} {}", entity, key)),
        other => other.into(),
    }
}
