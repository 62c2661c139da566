//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - Vocabulary items grouped into decks
//! - Difficulty records with a chosen history
//! - Pre-built pool scenarios for common test cases

use std::collections::HashMap;

use cadence_core::{
    DeckId, DifficultyRecord, Item, ItemId, LanguagePair, MemoryStore, PoolEntry, Rating, UserId,
};
use chrono::{Duration, Utc};

/// Ukrainian-English word pairs used for generated items
pub const VOCABULARY: [(&str, &str); 12] = [
    ("кіт", "cat"),
    ("пес", "dog"),
    ("дім", "house"),
    ("вода", "water"),
    ("хліб", "bread"),
    ("сонце", "sun"),
    ("місто", "city"),
    ("книга", "book"),
    ("дерево", "tree"),
    ("море", "sea"),
    ("вікно", "window"),
    ("зима", "winter"),
];

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let store = MemoryStore::new();
/// let (deck, items) = TestDataFactory::create_deck(&store, user, 8);
/// let scenario = TestDataFactory::create_full_pool_scenario(&store, user, 5, 2);
/// ```
pub struct TestDataFactory;

/// Scenario containing related test data
#[derive(Debug)]
pub struct TestScenario {
    pub user: UserId,
    pub deck: DeckId,
    /// Every item created for the scenario
    pub items: Vec<ItemId>,
    /// Items the scenario singles out (e.g. purge candidates)
    pub marked: Vec<ItemId>,
    pub description: String,
    /// Metadata for test assertions
    pub metadata: HashMap<String, String>,
}

impl TestDataFactory {
    // ========================================================================
    // ITEMS
    // ========================================================================

    pub fn languages() -> LanguagePair {
        LanguagePair::new("uk", "en")
    }

    /// Create one item in `deck`
    pub fn create_item(store: &MemoryStore, user: UserId, deck: DeckId, front: &str, back: &str) -> ItemId {
        let item = Item::new(user, deck, Self::languages(), front, back);
        let id = item.id;
        store.insert_item(item);
        id
    }

    /// Create a deck with `count` items drawn from [`VOCABULARY`]
    pub fn create_deck(store: &MemoryStore, user: UserId, count: usize) -> (DeckId, Vec<ItemId>) {
        let deck = DeckId::new();
        let items = (0..count)
            .map(|n| {
                let (front, back) = VOCABULARY[n % VOCABULARY.len()];
                let round = n / VOCABULARY.len();
                if round == 0 {
                    Self::create_item(store, user, deck, front, back)
                } else {
                    Self::create_item(
                        store,
                        user,
                        deck,
                        &format!("{} {}", front, round),
                        &format!("{} {}", back, round),
                    )
                }
            })
            .collect();
        (deck, items)
    }

    // ========================================================================
    // DIFFICULTY RECORDS
    // ========================================================================

    /// Store a record rated `minutes_ago` with the given interval and rating
    pub fn create_rated_record(
        store: &MemoryStore,
        user: UserId,
        item: ItemId,
        rating: Rating,
        interval: f64,
        minutes_ago: i64,
    ) -> DifficultyRecord {
        let mut record = DifficultyRecord::new(user, item);
        record.interval = interval;
        record.repetition_count = u32::from(rating.is_success());
        record.min_rating = Some(rating);
        record.last_rating = Some(rating);
        record.updated_at = Some(Utc::now() - Duration::minutes(minutes_ago));
        store.put_record(record);
        store.record(user, item).expect("record just stored")
    }

    // ========================================================================
    // SCENARIOS
    // ========================================================================

    /// A pool at `capacity` where `purgeable` entries reached the easy
    /// streak, plus as many spare items outside the pool
    pub fn create_full_pool_scenario(
        store: &MemoryStore,
        user: UserId,
        capacity: usize,
        purgeable: usize,
    ) -> TestScenario {
        let (deck, items) = Self::create_deck(store, user, capacity + purgeable);
        let now = Utc::now();
        let mut marked = Vec::new();
        for (n, item) in items.iter().take(capacity).enumerate() {
            let mut entry = PoolEntry::new(user, *item, 3, 2, now - Duration::minutes(n as i64));
            if n < purgeable {
                entry.easy_streak = 2;
                marked.push(*item);
            }
            store.insert_pool_entry(entry);
        }

        let mut metadata = HashMap::new();
        metadata.insert("capacity".to_string(), capacity.to_string());
        metadata.insert("spare".to_string(), purgeable.to_string());
        TestScenario {
            user,
            deck,
            items,
            marked,
            description: format!("full pool of {} with {} purge candidates", capacity, purgeable),
            metadata,
        }
    }

    /// A pool holding more entries than `capacity`
    pub fn create_overflow_scenario(
        store: &MemoryStore,
        user: UserId,
        capacity: usize,
        overflow: usize,
    ) -> TestScenario {
        let (deck, items) = Self::create_deck(store, user, capacity + overflow);
        let now = Utc::now();
        // the first `overflow` items are the least recently touched
        for (n, item) in items.iter().enumerate() {
            let age = (items.len() - n) as i64;
            store.insert_pool_entry(PoolEntry::new(user, *item, 0, 2, now - Duration::minutes(age)));
        }
        let mut metadata = HashMap::new();
        metadata.insert("capacity".to_string(), capacity.to_string());
        metadata.insert("overflow".to_string(), overflow.to_string());
        TestScenario {
            user,
            deck,
            marked: items[..overflow].to_vec(),
            items,
            description: format!("pool {} entries over capacity {}", overflow, capacity),
            metadata,
        }
    }
}
