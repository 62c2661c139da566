//! # Cadence Core
//!
//! Spaced-repetition scheduling engine for a vocabulary trainer. It decides
//! which item a learner sees next and updates the item's difficulty after
//! every answer.
//!
//! - **SM-2 difficulty model**: per user and item ease ratio and interval
//! - **Review pool**: a bounded Leitner rotation with promotion and purge
//! - **Sort criteria**: composable ranking rules with periodic exploration
//! - **Item selector**: pool, deck and global paths with a look-back window
//! - **Sessions**: size and unrated limits, exercise resolution
//!
//! Storage is reached only through the async traits in [`store`]; the
//! [`store::memory::MemoryStore`] implements all of them in process.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cadence_core::{
//!     Engine, EngineConfig, LanguagePair, MemoryStore, PlainOnly, Rating, Repositories,
//!     SessionKind, SessionRequest,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = Engine::new(Repositories::from_store(store), Arc::new(PlainOnly), EngineConfig::default())?;
//!
//! let session = engine.start_session(SessionRequest {
//!     user,
//!     kind: SessionKind::Mixed,
//!     deck: None,
//!     languages: LanguagePair::new("uk", "en"),
//!     size: None,
//! }).await?;
//!
//! let session = engine.advance(session.id, chrono::Utc::now()).await?;
//! let item = session.pending_ids()[0];
//! engine.rate(session.id, item, Rating::Good, chrono::Utc::now()).await?;
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod criteria;
pub mod engine;
pub mod error;
pub mod pool;
pub mod random;
pub mod repetition;
pub mod selector;
pub mod session;
pub mod sm2;
pub mod store;
pub mod types;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use config::{EngineConfig, PoolConfig, SelectorConfig, SessionConfig};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use types::{DeckId, ExerciseId, Item, ItemId, LanguagePair, SessionId, UserId};

// SM-2
pub use sm2::{DifficultyModel, DifficultyRecord, Rating, MIN_EASE_RATIO};

// Ranking
pub use criteria::{SortCriterion, DEFAULT_ORDERING, POLL_FILL_ORDERING, POOL_ORDERING};

// Pool, selection and sessions
pub use pool::{PoolEntry, PoolState, RefreshOutcome, ReviewPool};
pub use repetition::RepetitionOrchestrator;
pub use selector::{ItemSelector, SelectionContext};
pub use session::{
    Exercise, ExerciseBuilder, ExerciseType, PlainOnly, SessionKind, SessionProgress,
    SessionRequest, SessionState, SessionStatus, UNRATED_LIMIT,
};

// Storage contracts
pub use store::memory::{FailPoint, MemoryStore};
pub use store::{
    DifficultyRepository, ItemRepository, PoolRepository, RatingStore, Repositories,
    SessionRepository, StoreError, StoreResult,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
