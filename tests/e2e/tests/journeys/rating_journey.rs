//! # Rating Journey Tests
//!
//! Ratings as a learner produces them, checked against the SM-2 variant:
//!
//! 1. First answers set the early intervals
//! 2. Success streaks multiply the interval by the ease ratio
//! 3. A failure resets the streak
//! 4. The ease ratio never drops below its floor
//! 5. Concurrent writes and failing stores never leave half a rating behind

use cadence_core::{
    DifficultyModel, DifficultyRecord, EngineError, FailPoint, ItemId, MIN_EASE_RATIO, Rating,
    StoreError,
};
use cadence_e2e_tests::{TestDataFactory, TestStoreManager};
use chrono::Utc;

#[tokio::test]
async fn test_first_very_good_rating() {
    let t = TestStoreManager::new();
    let item = ItemId::new();

    let record = t
        .engine
        .rate_item(t.user, item, Rating::VeryGood, Utc::now())
        .await
        .unwrap();

    let expected_ease = DifficultyModel::apply(&DifficultyRecord::new(t.user, item), Rating::VeryGood)
        .ease_ratio;
    assert_eq!(record.interval, 6.0);
    assert_eq!(record.repetition_count, 1);
    assert_eq!(record.ease_ratio, expected_ease);
    assert!((record.ease_ratio - 2.6).abs() < 1e-9);
}

#[tokio::test]
async fn test_good_streak_then_failure() {
    let t = TestStoreManager::new();
    let item = ItemId::new();
    let mut intervals = Vec::new();
    let mut ease = Vec::new();

    for _ in 0..3 {
        let record = t
            .engine
            .rate_item(t.user, item, Rating::Good, Utc::now())
            .await
            .unwrap();
        intervals.push(record.interval);
        ease.push(record.ease_ratio);
    }
    assert_eq!(intervals[..2], [1.0, 6.0]);
    assert!((intervals[2] - 6.0 * ease[1]).abs() < 1e-9);

    let failed = t
        .engine
        .rate_item(t.user, item, Rating::Weak, Utc::now())
        .await
        .unwrap();
    assert_eq!(failed.interval, 1.0);
    assert_eq!(failed.repetition_count, 0);
    assert_eq!(failed.min_rating, Some(Rating::Weak));
    assert_eq!(failed.session_repetitions, 4);
}

#[tokio::test]
async fn test_ease_floor_holds_for_any_sequence() {
    let t = TestStoreManager::new();
    let item = ItemId::new();
    let sequence = [
        Rating::Unknown,
        Rating::Unknown,
        Rating::Weak,
        Rating::Unknown,
        Rating::Good,
        Rating::Unknown,
        Rating::Weak,
        Rating::Unknown,
        Rating::Unknown,
        Rating::VeryGood,
        Rating::Unknown,
    ];
    for rating in sequence {
        let record = t
            .engine
            .rate_item(t.user, item, rating, Utc::now())
            .await
            .unwrap();
        assert!(record.ease_ratio >= MIN_EASE_RATIO);
    }
    assert_eq!(t.store.record(t.user, item).unwrap().ease_ratio, MIN_EASE_RATIO);
}

#[tokio::test]
async fn test_concurrent_write_is_retried_once() {
    let t = TestStoreManager::new();
    let item = ItemId::new();
    TestDataFactory::create_rated_record(&t.store, t.user, item, Rating::Good, 1.0, 60);

    t.store.fail_next(FailPoint::RatingConflict);
    let record = t
        .engine
        .rate_item(t.user, item, Rating::Good, Utc::now())
        .await
        .unwrap();
    assert_eq!(record.interval, 6.0);
    assert_eq!(record.repetition_count, 2);
}

#[tokio::test]
async fn test_stale_writer_loses_to_fresh_read() {
    let t = TestStoreManager::new();
    let item = ItemId::new();
    t.engine
        .rate_item(t.user, item, Rating::Good, Utc::now())
        .await
        .unwrap();

    // a writer still holding the pre-rating version is rejected
    let stale = DifficultyRecord::new(t.user, item);
    let err = cadence_core::DifficultyRepository::save_many(t.store.as_ref(), &[stale])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
async fn test_failed_pool_write_rolls_back_rating() {
    let t = TestStoreManager::new();
    let (_, items) = t.seed_deck(t.user, 1);
    t.seed_pool(t.user, &items, 2);

    t.store.fail_next(FailPoint::RatingPoolWrite);
    let err = t
        .engine
        .rate_item(t.user, items[0], Rating::VeryGood, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert!(t.store.record(t.user, items[0]).is_none());
    let entry = &t.store.pool_entries(t.user)[0];
    assert_eq!(entry.level, 2);
    assert_eq!(entry.easy_streak, 0);

    // the same rating succeeds once the store recovers
    t.engine
        .rate_item(t.user, items[0], Rating::VeryGood, Utc::now())
        .await
        .unwrap();
    let entry = &t.store.pool_entries(t.user)[0];
    assert_eq!(entry.level, 6);
    assert_eq!(entry.easy_streak, 1);
}
