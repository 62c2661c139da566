//! # Exercise Journey Tests
//!
//! Which exercise accompanies a served item:
//!
//! 1. Mixed sessions serve unrated or weakly known items plain
//! 2. Mixed sessions draw exercises for items last rated good or better
//! 3. Single-mode sessions always ask for their exercise
//! 4. A builder that declines leaves the item plain

use std::sync::Arc;

use cadence_core::{
    DeckId, EngineConfig, Exercise, ExerciseType, Rating, SessionKind, SessionRequest,
};
use cadence_e2e_tests::harness::TEST_SEED;
use cadence_e2e_tests::{RecordingExerciseBuilder, TestDataFactory, TestStoreManager};
use chrono::Utc;

fn request(t: &TestStoreManager, deck: DeckId, kind: SessionKind, size: u32) -> SessionRequest {
    SessionRequest {
        user: t.user,
        kind,
        deck: Some(deck),
        languages: TestStoreManager::languages(),
        size: Some(size),
    }
}

#[tokio::test]
async fn test_unrated_items_are_served_plain() {
    let t = TestStoreManager::new();
    let (deck, _) = t.seed_deck(t.user, 8);
    let session = t
        .engine
        .start_session(request(&t, deck, SessionKind::Mixed, 8))
        .await
        .unwrap();

    for _ in 0..5 {
        t.engine.advance(session.id, Utc::now()).await.unwrap();
    }
    let session = t.engine.session(session.id).await.unwrap();
    assert_eq!(session.current_item_count(), 5);
    assert!(session.items.iter().all(|i| i.exercise == Exercise::Plain));
    assert!(t.exercises.calls().is_empty());
}

#[tokio::test]
async fn test_weakly_known_items_are_served_plain() {
    let t = TestStoreManager::new();
    let (deck, items) = t.seed_deck(t.user, 5);
    for item in &items {
        TestDataFactory::create_rated_record(&t.store, t.user, *item, Rating::Weak, 1.0, 120);
    }
    let session = t
        .engine
        .start_session(request(&t, deck, SessionKind::Mixed, 5))
        .await
        .unwrap();
    for _ in 0..5 {
        t.engine.advance(session.id, Utc::now()).await.unwrap();
    }
    assert!(t.exercises.calls().is_empty());
}

#[tokio::test]
async fn test_known_items_get_drawn_exercises() {
    let t = TestStoreManager::new();
    let (deck, items) = t.seed_deck(t.user, 10);
    for item in &items {
        TestDataFactory::create_rated_record(&t.store, t.user, *item, Rating::Good, 1.0, 60 * 48);
    }

    let mut served = Vec::new();
    for _ in 0..4 {
        let session = t
            .engine
            .start_session(request(&t, deck, SessionKind::Mixed, 5))
            .await
            .unwrap();
        for _ in 0..5 {
            t.serve_and_rate(&session, Rating::Good).await.unwrap();
        }
        served.extend(t.engine.session(session.id).await.unwrap().items);
    }

    let attached: Vec<_> = served
        .iter()
        .filter(|i| i.exercise != Exercise::Plain)
        .collect();
    assert!(!attached.is_empty());

    // one build per attached exercise, never one for plain draws
    let calls = t.exercises.calls();
    assert_eq!(calls.len(), attached.len());
    assert!(calls.iter().all(|(_, kind)| *kind != ExerciseType::Plain));
    for item in attached {
        assert!(item.exercise.exercise_id().is_some());
        assert!(calls.contains(&(item.item, item.exercise.exercise_type())));
    }
}

#[tokio::test]
async fn test_single_mode_always_builds() {
    let t = TestStoreManager::new();
    let (deck, _) = t.seed_deck(t.user, 6);
    let session = t
        .engine
        .start_session(request(&t, deck, SessionKind::Single(ExerciseType::Unscramble), 6))
        .await
        .unwrap();
    for _ in 0..3 {
        t.engine.advance(session.id, Utc::now()).await.unwrap();
    }

    let session = t.engine.session(session.id).await.unwrap();
    assert!(session
        .items
        .iter()
        .all(|i| i.exercise.exercise_type() == ExerciseType::Unscramble));
    assert_eq!(t.exercises.calls().len(), 3);
}

#[tokio::test]
async fn test_declining_builder_falls_back_to_plain() {
    let builder = Arc::new(RecordingExerciseBuilder::declining());
    let t = TestStoreManager::with_builder(
        builder.clone(),
        EngineConfig {
            seed: Some(TEST_SEED),
            ..EngineConfig::default()
        },
    );
    let (deck, _) = t.seed_deck(t.user, 3);
    let session = t
        .engine
        .start_session(request(&t, deck, SessionKind::Single(ExerciseType::WordMatch), 3))
        .await
        .unwrap();

    let session = t.engine.advance(session.id, Utc::now()).await.unwrap();
    assert_eq!(session.items[0].exercise, Exercise::Plain);
    assert_eq!(builder.calls().len(), 1);
    assert_eq!(builder.calls()[0].1, ExerciseType::WordMatch);
}
