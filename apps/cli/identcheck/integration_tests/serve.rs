use crate::helpers::{FakeIdentServer, IdentAnswer, ask_gate, issued_key, status_line};

use identcheck::commands::serve::{ServeHandle, start};
use identcheck::session::SessionCache;

use ident_core::{IdentClient, IdentConfig, ServerIdentity};

use std::sync::Arc;

// ============================================================================
// Same-user gate: session line in, status line (and issued key) out
// ============================================================================

async fn start_gate(ident: &FakeIdentServer, sessions: SessionCache) -> ServeHandle {
    let client = IdentClient::new(IdentConfig::new(ident.port, 2));
    let identity = Arc::new(ServerIdentity::new("svc", Some(4242)));

    start("127.0.0.1:0".parse().unwrap(), client, identity, sessions)
        .await
        .expect("Failed to start gate")
}

/// **VALUE**: Verifies the gate admits a loopback peer that identd reports as the service user.
///
/// **WHY THIS MATTERS**: This is the whole point of the gate; a wrong answer here either
/// locks the owner out or lets someone else in.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The gate queries identd with its own endpoints swapped
/// - The status line is not CRLF-terminated
/// - No session key is issued, or the decision is not stored under it
#[tokio::test]
async fn given_peer_is_service_user_when_asking_gate_then_200_and_session_issued() {
    // GIVEN: identd reporting the service user, and a gate in front of it
    let ident = FakeIdentServer::start(IdentAnswer::User("svc")).await;
    let sessions = SessionCache::new();
    let gate = start_gate(&ident, sessions.clone()).await;

    // WHEN: Asking without a session key
    let answer = ask_gate(gate.local_addr(), "").await;

    // THEN: 200 OK plus a key remembered as true
    assert_eq!(status_line(&answer), "200 OK\r\n");
    let key = issued_key(&answer).expect("No session key issued");
    assert_eq!(sessions.get(&key).await, Some(true));
}

#[tokio::test]
async fn given_peer_is_other_user_when_asking_gate_then_403() {
    let ident = FakeIdentServer::start(IdentAnswer::User("mallory")).await;
    let gate = start_gate(&ident, SessionCache::new()).await;

    let answer = ask_gate(gate.local_addr(), "").await;

    assert_eq!(status_line(&answer), "403 Forbidden\r\n");
}

/// **VALUE**: Verifies an issued session is only looked up once.
///
/// **BUG THIS CATCHES**: Would catch the gate ignoring its own keys, multiplying identd
/// load by the number of requests in a session.
#[tokio::test]
async fn given_issued_session_key_when_asking_gate_again_then_identd_queried_once() {
    // GIVEN: A gate over a counting identd, and a key from a first request
    let ident = FakeIdentServer::start(IdentAnswer::User("svc")).await;
    let gate = start_gate(&ident, SessionCache::new()).await;
    let first = ask_gate(gate.local_addr(), "").await;
    let key = issued_key(&first).expect("No session key issued");

    // WHEN: Presenting the key
    let second = ask_gate(gate.local_addr(), &key).await;

    // THEN: Same answer, no new key, one ident query
    assert_eq!(status_line(&second), "200 OK\r\n");
    assert_eq!(issued_key(&second), None);
    assert_eq!(ident.query_count(), 1);
}

/// **VALUE**: Verifies a client-chosen key cannot borrow another user's approval.
///
/// **WHY THIS MATTERS**: Session keys would otherwise be bearer tokens: anyone naming a key
/// an approved user had used would pass the gate without identd being asked.
///
/// **BUG THIS CATCHES**: Would catch the gate trusting any key present in the cache,
/// whoever chose it, instead of only the keys it issued itself.
#[tokio::test]
async fn given_approved_key_named_by_other_user_when_asking_gate_then_403_and_identd_asked() {
    // GIVEN: An approval cached under a client-chosen key, and identd now reporting mallory
    let ident = FakeIdentServer::start(IdentAnswer::User("mallory")).await;
    let sessions = SessionCache::new();
    sessions.store("alice-session", true).await;
    let gate = start_gate(&ident, sessions).await;

    // WHEN: mallory presents that key
    let answer = ask_gate(gate.local_addr(), "alice-session").await;

    // THEN: Checked afresh and denied
    assert_eq!(status_line(&answer), "403 Forbidden\r\n");
    assert_eq!(ident.query_count(), 1);
}

/// **VALUE**: Verifies an unknown UUID is treated like no key at all.
#[tokio::test]
async fn given_unissued_uuid_key_when_asking_gate_then_checked_afresh() {
    // GIVEN: svc is approved once, then identd switches to mallory
    let ident = FakeIdentServer::start(IdentAnswer::User("svc")).await;
    let gate = start_gate(&ident, SessionCache::new()).await;
    let approved = ask_gate(gate.local_addr(), "").await;
    let approved_key = issued_key(&approved).expect("No session key issued");
    ident.set_answer(IdentAnswer::User("mallory"));

    // WHEN: mallory guesses a well-formed key the gate never issued
    let guessed = uuid::Uuid::new_v4().to_string();
    let answer = ask_gate(gate.local_addr(), &guessed).await;

    // THEN: Denied after a fresh lookup, under a new key
    assert_eq!(status_line(&answer), "403 Forbidden\r\n");
    assert_eq!(ident.query_count(), 2);
    let denied_key = issued_key(&answer).expect("No session key issued");
    assert_ne!(denied_key, guessed);
    assert_ne!(denied_key, approved_key);
}

/// **VALUE**: Verifies an ident failure yields 500, issues no key and is retried.
#[tokio::test]
async fn given_identd_error_when_asking_gate_then_500_and_not_cached() {
    let ident = FakeIdentServer::start(IdentAnswer::Error("UNKNOWN-ERROR")).await;
    let sessions = SessionCache::new();
    let gate = start_gate(&ident, sessions.clone()).await;

    let first = ask_gate(gate.local_addr(), "").await;
    let second = ask_gate(gate.local_addr(), "").await;

    assert_eq!(first, "500 Internal Server Error\r\n");
    assert_eq!(second, "500 Internal Server Error\r\n");
    assert_eq!(ident.query_count(), 2);
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn given_blank_session_lines_when_asking_gate_then_each_gets_own_key() {
    let ident = FakeIdentServer::start(IdentAnswer::User("svc")).await;
    let sessions = SessionCache::new();
    let gate = start_gate(&ident, sessions.clone()).await;

    let first = issued_key(&ask_gate(gate.local_addr(), "").await);
    let second = issued_key(&ask_gate(gate.local_addr(), "").await);

    assert!(first.is_some());
    assert_ne!(first, second);
    assert_eq!(ident.query_count(), 2);
    assert_eq!(sessions.len().await, 2);
}
