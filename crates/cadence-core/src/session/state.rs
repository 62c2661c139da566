//! Session state and its transitions.
//!
//! ```text
//! started --advance--> in_progress --rate (rated == limit)--> finished
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::sm2::Rating;
use crate::types::{DeckId, ExerciseId, ItemId, LanguagePair, SessionId, UserId};

/// Maximum number of served items awaiting a rating
pub const UNRATED_LIMIT: u32 = 5;

// ============================================================================
// EXERCISES
// ============================================================================

/// Exercise shape an item can be presented in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    /// Plain recall of the back side
    Plain,
    /// Rebuild the word from shuffled letters
    Unscramble,
    /// Match words to their translations
    WordMatch,
}

impl ExerciseType {
    /// Types a mixed session draws from
    pub const MIXED: [ExerciseType; 3] = [
        ExerciseType::Plain,
        ExerciseType::Unscramble,
        ExerciseType::WordMatch,
    ];
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExerciseType::Plain => write!(f, "plain"),
            ExerciseType::Unscramble => write!(f, "unscramble"),
            ExerciseType::WordMatch => write!(f, "word_match"),
        }
    }
}

/// Exercise attached to a served item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Exercise {
    Plain,
    Unscramble { id: ExerciseId },
    WordMatch { id: ExerciseId },
}

impl Exercise {
    pub fn exercise_type(&self) -> ExerciseType {
        match self {
            Exercise::Plain => ExerciseType::Plain,
            Exercise::Unscramble { .. } => ExerciseType::Unscramble,
            Exercise::WordMatch { .. } => ExerciseType::WordMatch,
        }
    }

    /// Reference to the materialized exercise, if any
    pub fn exercise_id(&self) -> Option<ExerciseId> {
        match self {
            Exercise::Plain => None,
            Exercise::Unscramble { id } | Exercise::WordMatch { id } => Some(*id),
        }
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// Exercise policy of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "exercise", rename_all = "snake_case")]
pub enum SessionKind {
    /// Every item uses one exercise type
    Single(ExerciseType),
    /// Exercise type drawn per item
    Mixed,
}

/// Lifecycle position of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Started,
    InProgress,
    Finished,
}

/// An item served in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    pub item: ItemId,
    pub exercise: Exercise,
    pub rating: Option<Rating>,
}

impl SessionItem {
    pub fn is_rated(&self) -> bool {
        self.rating.is_some()
    }
}

/// One learning session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: SessionId,
    pub owner: UserId,
    pub kind: SessionKind,
    /// Bound deck; pool/global mode when `None`
    pub deck: Option<DeckId>,
    pub languages: LanguagePair,
    pub size_limit: u32,
    /// Served items in serving order
    pub items: Vec<SessionItem>,
    pub finished: bool,
    pub started_at: DateTime<Utc>,
    /// Optimistic concurrency version; 0 until first persisted
    pub version: u64,
}

impl SessionState {
    pub fn new(
        owner: UserId,
        kind: SessionKind,
        deck: Option<DeckId>,
        languages: LanguagePair,
        size_limit: u32,
    ) -> Self {
        Self {
            id: SessionId::new(),
            owner,
            kind,
            deck,
            languages,
            size_limit,
            items: Vec::new(),
            finished: false,
            started_at: Utc::now(),
            version: 0,
        }
    }

    /// The session draws from the review pool rather than a deck
    pub fn uses_pool(&self) -> bool {
        self.deck.is_none()
    }

    pub fn current_item_count(&self) -> u32 {
        self.items.len() as u32
    }

    pub fn unrated_item_count(&self) -> u32 {
        self.items.iter().filter(|i| !i.is_rated()).count() as u32
    }

    pub fn rated_item_count(&self) -> u32 {
        self.items.iter().filter(|i| i.is_rated()).count() as u32
    }

    pub fn status(&self) -> SessionStatus {
        if self.finished {
            SessionStatus::Finished
        } else if self.items.is_empty() {
            SessionStatus::Started
        } else {
            SessionStatus::InProgress
        }
    }

    /// Served items still waiting for a rating
    pub fn pending(&self) -> impl Iterator<Item = &SessionItem> {
        self.items.iter().filter(|i| !i.is_rated())
    }

    pub fn pending_ids(&self) -> Vec<ItemId> {
        self.pending().map(|i| i.item).collect()
    }

    /// Room for one more item under both the unrated limit and the size limit
    pub fn can_accept_next(&self) -> bool {
        !self.finished
            && self.unrated_item_count() < UNRATED_LIMIT
            && self.current_item_count() < self.size_limit
    }

    /// Queue a served item. Returns `false` without change when full.
    pub fn push(&mut self, item: ItemId, exercise: Exercise) -> bool {
        if !self.can_accept_next() {
            return false;
        }
        self.items.push(SessionItem {
            item,
            exercise,
            rating: None,
        });
        true
    }

    /// Slot `mark_rated` fills for `item`: its oldest unrated occurrence
    pub fn unrated_slot(&self, item: ItemId) -> Option<usize> {
        self.items
            .iter()
            .position(|i| i.item == item && !i.is_rated())
    }

    /// Clear the rating held in `slot` when it still belongs to `item`.
    /// Slots are append-only, so an index stays valid across saves.
    pub fn clear_rating(&mut self, slot: usize, item: ItemId) -> bool {
        match self.items.get_mut(slot) {
            Some(s) if s.item == item && s.is_rated() => {
                s.rating = None;
                true
            }
            _ => false,
        }
    }

    /// Record `rating` on the oldest unrated occurrence of `item`
    pub fn mark_rated(&mut self, item: ItemId, rating: Rating) -> Result<SessionStatus> {
        if self.finished {
            return Err(EngineError::SessionFinished(self.id));
        }
        let mut seen = false;
        let slot = self.items.iter_mut().find(|i| {
            if i.item == item {
                seen = true;
                !i.is_rated()
            } else {
                false
            }
        });
        match slot {
            Some(slot) => slot.rating = Some(rating),
            None if seen => return Err(EngineError::AlreadyRated(item)),
            None => return Err(EngineError::not_found("session item", item)),
        }
        if self.rated_item_count() >= self.size_limit {
            self.finished = true;
        }
        Ok(self.status())
    }
}
