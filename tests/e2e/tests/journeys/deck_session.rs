//! # Deck Session Journey Tests
//!
//! A learner works through a deck-bound session:
//!
//! 1. Start a session, which closes the previous one
//! 2. Advance until the unrated limit pushes back
//! 3. Rate items until the session finishes
//! 4. Small decks repeat items instead of running dry

use std::collections::HashSet;

use cadence_core::{EngineError, ItemId, Rating, SessionStatus, UNRATED_LIMIT};
use cadence_e2e_tests::TestStoreManager;
use chrono::Utc;

#[tokio::test]
async fn test_backpressure_at_unrated_limit() {
    let t = TestStoreManager::new();
    let (deck, _) = t.seed_deck(t.user, 12);
    let session = t.engine.start_session(t.deck_request(deck, 10)).await.unwrap();

    for _ in 0..UNRATED_LIMIT {
        t.engine.advance(session.id, Utc::now()).await.unwrap();
    }
    let before = t.engine.session(session.id).await.unwrap();
    assert_eq!(before.unrated_item_count(), UNRATED_LIMIT);
    assert!(!before.can_accept_next());

    let after = t.engine.advance(session.id, Utc::now()).await.unwrap();
    assert_eq!(after.pending_ids(), before.pending_ids());
    assert_eq!(after.current_item_count(), before.current_item_count());
}

#[tokio::test]
async fn test_session_runs_to_completion() {
    let t = TestStoreManager::new();
    let (deck, items) = t.seed_deck(t.user, 8);
    let session = t.engine.start_session(t.deck_request(deck, 6)).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Started);

    let mut rated = Vec::new();
    for _ in 0..6 {
        let item = t.serve_and_rate(&session, Rating::Good).await.unwrap();
        assert!(items.contains(&item));
        rated.push(item);
    }

    let session = t.engine.session(session.id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Finished);
    assert_eq!(session.rated_item_count(), 6);

    // every rated item now has a record
    for item in rated {
        assert!(t.store.record(t.user, item).is_some());
    }

    let err = t
        .engine
        .rate(session.id, session.items[0].item, Rating::Good, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SessionFinished(_)));
}

#[tokio::test]
async fn test_unrated_limit_holds_over_a_long_trace() {
    let t = TestStoreManager::new();
    let (deck, _) = t.seed_deck(t.user, 10);
    let session = t.engine.start_session(t.deck_request(deck, 30)).await.unwrap();

    // advance three times for every two ratings
    for step in 0..60 {
        let current = t.engine.advance(session.id, Utc::now()).await.unwrap();
        assert!(current.unrated_item_count() <= UNRATED_LIMIT);
        assert!(current.current_item_count() <= current.size_limit);
        if current.finished {
            break;
        }
        if step % 3 == 2 {
            continue;
        }
        if let Some(item) = current.pending_ids().first().copied() {
            t.engine
                .rate(session.id, item, Rating::Weak, Utc::now())
                .await
                .unwrap();
        }
    }
}

#[tokio::test]
async fn test_small_deck_repeats_instead_of_failing() {
    let t = TestStoreManager::new();
    let (deck, items) = t.seed_deck(t.user, 2);
    let session = t.engine.start_session(t.deck_request(deck, 6)).await.unwrap();

    let mut served = Vec::new();
    for _ in 0..6 {
        served.push(t.serve_and_rate(&session, Rating::VeryGood).await.unwrap());
    }
    let distinct: HashSet<ItemId> = served.iter().copied().collect();
    assert_eq!(distinct.len(), 2);
    assert!(distinct.iter().all(|id| items.contains(id)));
}

#[tokio::test]
async fn test_pending_items_are_never_duplicated() {
    let t = TestStoreManager::new();
    let (deck, _) = t.seed_deck(t.user, 2);
    let session = t.engine.start_session(t.deck_request(deck, 10)).await.unwrap();

    for _ in 0..4 {
        t.engine.advance(session.id, Utc::now()).await.unwrap();
    }
    let session = t.engine.session(session.id).await.unwrap();
    assert_eq!(session.pending_ids().len(), 2);
}

#[tokio::test]
async fn test_starting_a_session_closes_the_previous_one() {
    let t = TestStoreManager::new();
    let (deck, _) = t.seed_deck(t.user, 4);
    let first = t.engine.start_session(t.deck_request(deck, 5)).await.unwrap();
    let rated = t.serve_and_rate(&first, Rating::Good).await.unwrap();
    assert_eq!(t.store.record(t.user, rated).unwrap().session_repetitions, 1);

    let second = t.engine.start_session(t.deck_request(deck, 5)).await.unwrap();
    assert!(t.engine.session(first.id).await.unwrap().finished);
    assert_eq!(second.status(), SessionStatus::Started);
    assert_eq!(t.store.sessions_of(t.user).len(), 2);

    // session repetitions restart with the new session
    assert_eq!(t.store.record(t.user, rated).unwrap().session_repetitions, 0);
}

#[tokio::test]
async fn test_unknown_session() {
    let t = TestStoreManager::new();
    let err = t
        .engine
        .advance(cadence_core::SessionId::new(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}
