//! Identifiers and item metadata shared by every component.
//!
//! Identifiers are thin `Uuid` newtypes so a `UserId` can never be passed
//! where an `ItemId` is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The wrapped UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// A learner
    UserId
);
id_type!(
    /// A single recallable learning unit (word pair)
    ItemId
);
id_type!(
    /// A deck grouping items
    DeckId
);
id_type!(
    /// A learning session
    SessionId
);
id_type!(
    /// A materialized exercise produced by an exercise builder
    ExerciseId
);

/// Language direction of a word pair, e.g. `de -> en`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    /// Language shown on the prompt side
    pub front: String,
    /// Language expected in the answer
    pub back: String,
}

impl LanguagePair {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.front, self.back)
    }
}

/// A word pair the scheduler can present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub owner: UserId,
    pub deck: DeckId,
    pub languages: LanguagePair,
    pub front: String,
    pub back: String,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Create an item owned by `owner` in `deck`
    pub fn new(
        owner: UserId,
        deck: DeckId,
        languages: LanguagePair,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId::new(),
            owner,
            deck,
            languages,
            front: front.into(),
            back: back.into(),
            created_at: Utc::now(),
        }
    }
}
