//! Engine error types
//!
//! Validation and state-conflict failures reach the caller as typed variants.
//! Capacity overflow and dangling pool entries are corrected internally and
//! only show up here as `DataInconsistency` when the corrective pass fails.

use crate::store::StoreError;
use crate::types::{ItemId, SessionId};

/// Engine error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Referenced entity does not exist (or is not part of the session)
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    /// The session item already carries a rating
    #[error("Item already rated in this session: {0}")]
    AlreadyRated(ItemId),
    /// The session reached its size limit and accepts no more ratings
    #[error("Session is finished: {0}")]
    SessionFinished(SessionId),
    /// Stored data contradicts itself and a corrective pass did not help
    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),
    /// A concurrent write won twice in a row
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
    /// Repository failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;
