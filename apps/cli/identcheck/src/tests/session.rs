// Unit tests for the session cache

use crate::session::SessionCache;

use ident_core::AccessDecision;
use models::ErrorKind;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// **VALUE**: Verifies a session is evaluated once and then answered from cache.
///
/// **WHY THIS MATTERS**: Every request of a session would otherwise cost an ident round
/// trip, adding up to the full timeout per request when identd is slow.
#[tokio::test]
async fn given_cached_decision_when_evaluating_again_then_compute_not_called() {
    // GIVEN: A cache and a counting computation
    let cache = SessionCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    // WHEN: Evaluating the same key twice
    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        let decision = cache
            .evaluate_cached("session-a", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                AccessDecision::SameUser
            })
            .await;
        assert_eq!(decision, AccessDecision::SameUser);
    }

    // THEN: Computed once, stored as true
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get("session-a").await, Some(true));
}

/// **VALUE**: Verifies negative decisions are cached too.
#[tokio::test]
async fn given_other_user_decision_when_evaluating_then_false_cached() {
    let cache = SessionCache::new();

    let first = cache
        .evaluate_cached("session-b", || async { AccessDecision::OtherUser })
        .await;
    let second = cache
        .evaluate_cached("session-b", || async { AccessDecision::SameUser })
        .await;

    assert_eq!(first, AccessDecision::OtherUser);
    assert_eq!(second, AccessDecision::OtherUser);
    assert_eq!(cache.get("session-b").await, Some(false));
}

/// **VALUE**: Verifies request errors are not cached.
///
/// **BUG THIS CATCHES**: Would catch a transient identd timeout locking a session into
/// "denied" (or worse, "allowed") for its whole lifetime.
#[tokio::test]
async fn given_failed_lookup_when_evaluating_then_nothing_cached_and_retried() {
    // GIVEN: A first evaluation that times out
    let cache = SessionCache::new();
    let failed = cache
        .evaluate_cached("session-c", || async {
            AccessDecision::Failed(ErrorKind::Timeout)
        })
        .await;

    // WHEN: Evaluating again
    let retried = cache
        .evaluate_cached("session-c", || async { AccessDecision::SameUser })
        .await;

    // THEN: First failed, second computed and stored
    assert_eq!(failed, AccessDecision::Failed(ErrorKind::Timeout));
    assert_eq!(retried, AccessDecision::SameUser);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn given_existing_entry_when_storing_then_last_write_wins() {
    let cache = SessionCache::new();

    cache.store("session-d", true).await;
    cache.store("session-d", false).await;

    assert_eq!(cache.get("session-d").await, Some(false));
    assert!(!cache.is_empty().await);
}

#[tokio::test]
async fn given_cloned_cache_when_storing_then_visible_through_original() {
    let cache = SessionCache::new();
    let clone = cache.clone();

    clone.store("shared", true).await;

    assert_eq!(cache.get("shared").await, Some(true));
}
