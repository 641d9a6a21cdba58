use crate::helpers::{FakeIdentServer, error_reply, loopback_endpoints, userid_reply};

use ident_core::{IdentClient, IdentConfig, IdentError};
use models::{ErrorKind, ErrorToken};

use std::time::{Duration, Instant};

use tokio::net::TcpListener;

// ============================================================================
// Public API tests for IdentClient over real TCP
// These test the PUBLIC interface from an external consumer's perspective
// ============================================================================

// ----------------------------------------------------------------------------
// query_async()
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies a full exchange against a listening ident server.
///
/// **WHY THIS MATTERS**: Everything else in the crate assumes the wire exchange works:
/// connect, one request line, one reply line, close.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The query line is not CRLF-terminated and the server never answers
/// - The client connects to the peer's port instead of the configured ident port
/// - Reply fields are trimmed or reordered incorrectly
#[tokio::test]
async fn given_listening_ident_server_when_querying_then_reported_user_returned() {
    // GIVEN: An ident server that knows foo on AwesomeOS
    let server = FakeIdentServer::start(|query| Some(userid_reply(query, "AwesomeOS", "foo"))).await;
    let client = IdentClient::new(server.config(2));

    // WHEN: Querying local 3000 / remote 40000
    let response = client
        .query_async(loopback_endpoints(3000, 40000), None)
        .await
        .expect("Ident query failed");

    // THEN: foo/AwesomeOS, and the server saw the swapped port order
    assert_eq!(response.username(), Some("foo"));
    assert_eq!(response.os(), Some("AwesomeOS"));
    assert_eq!(server.queries(), vec![String::from("40000,3000\r\n")]);
}

/// **VALUE**: Verifies a server-side ERROR reaches callers with its token.
#[tokio::test]
async fn given_server_reports_hidden_user_when_querying_then_protocol_error_with_token() {
    // GIVEN: A server hiding its users
    let server = FakeIdentServer::start(|query| Some(error_reply(query, "HIDDEN-USER"))).await;
    let client = IdentClient::new(server.config(2));

    // WHEN: Querying
    let result = client.query_async(loopback_endpoints(3000, 40000), None).await;

    // THEN: Protocol error carrying HIDDEN-USER
    match result {
        Err(error) => {
            assert_eq!(error.kind(), ErrorKind::Protocol);
            assert_eq!(error.token(), Some(&ErrorToken::HiddenUser));
        }
        Ok(response) => panic!("Expected ERROR reply, got {response}"),
    }
}

/// **VALUE**: Verifies a peer with nothing on the ident port is a transport failure.
///
/// **BUG THIS CATCHES**: Would catch refused connections being misreported as timeouts
/// or, worse, as a successful empty identity.
#[tokio::test]
async fn given_no_ident_server_when_querying_then_transport_failure() {
    // GIVEN: A port that was bound and released, so nothing listens on it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let client = IdentClient::new(IdentConfig::new(port, 2));

    // WHEN: Fetching
    let response = client.fetch(loopback_endpoints(3000, 40000), None).await;

    // THEN: Failed response of kind transport
    assert!(!response.is_success());
    assert_eq!(response.error_kind(), Some(ErrorKind::Transport));
}

/// **VALUE**: Verifies a server that accepts but never replies is bounded by the timeout.
#[tokio::test]
async fn given_silent_ident_server_when_querying_then_timeout_within_bound() {
    // GIVEN: A server that never answers and a 1s configured timeout
    let server = FakeIdentServer::start(|_| None).await;
    let client = IdentClient::new(server.config(1));
    let started = Instant::now();

    // WHEN: Querying
    let result = client.query_async(loopback_endpoints(3000, 40000), None).await;

    // THEN: Timeout, well before the server would have given up
    assert!(matches!(result, Err(IdentError::Timeout { .. })), "{result:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// **VALUE**: Verifies an answer for the wrong connection is rejected.
///
/// **WHY THIS MATTERS**: Accepting a reply about some other port pair would attribute
/// another connection's owner to this one.
#[tokio::test]
async fn given_reply_for_other_port_pair_when_querying_then_protocol_error() {
    let server =
        FakeIdentServer::start(|_| Some(String::from("1 , 2 : USERID : UNIX : foo\r\n"))).await;
    let client = IdentClient::new(server.config(2));

    let result = client.query_async(loopback_endpoints(3000, 40000), None).await;

    assert!(matches!(result, Err(IdentError::Protocol { .. })), "{result:?}");
}

// ----------------------------------------------------------------------------
// query() / query_with()
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the blocking form against a server running on another runtime.
#[test]
fn given_ident_server_on_background_runtime_when_querying_blocking_then_user_returned() {
    // GIVEN: Fake server on its own multi-threaded runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let server = runtime.block_on(FakeIdentServer::start(|query| {
        Some(userid_reply(query, "UNIX", "joe"))
    }));
    let client = IdentClient::new(server.config(2));

    // WHEN: Querying from this (non-async) thread
    let response = client
        .query(loopback_endpoints(3000, 40000), None)
        .expect("Blocking ident query failed");

    // THEN: joe
    assert_eq!(response.username(), Some("joe"));

    drop(server);
    runtime.shutdown_background();
}

/// **VALUE**: Verifies the callback form delivers a real exchange's response.
#[tokio::test]
async fn given_ident_server_when_querying_with_callback_then_callback_receives_user() {
    let server = FakeIdentServer::start(|query| Some(userid_reply(query, "UNIX", "joe"))).await;
    let client = IdentClient::new(server.config(2));
    let (tx, rx) = tokio::sync::oneshot::channel();

    client.query_with(loopback_endpoints(3000, 40000), None, move |response| {
        let _ = tx.send(response);
    });

    let response = rx.await.expect("Callback never fired");
    assert_eq!(response.username(), Some("joe"));
}
