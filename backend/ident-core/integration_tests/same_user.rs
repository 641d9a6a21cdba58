use crate::helpers::{FakeIdentServer, error_reply, loopback_endpoints, userid_reply};

use common::HttpStatusCode;
use ident_core::{AccessDecision, IdentClient, SameUserEvaluator, ServerIdentity};
use models::ErrorKind;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

// ============================================================================
// End-to-end same-user decisions: ident query -> evaluator -> status
// ============================================================================

/// **VALUE**: Verifies the full trust path for a real loopback connection.
///
/// **WHY THIS MATTERS**: This is the actual use: a local client connects to us, we ask
/// identd who owns the connection, and grant access only if it is us.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Endpoints taken from an accepted socket are passed in the wrong order
/// - The remote address recorded on the response is not the loopback peer
/// - The evaluator compares against something other than the service identity
#[tokio::test]
async fn given_loopback_connection_owned_by_service_user_when_checking_then_allowed() {
    // GIVEN: A service listening locally and a client connected to it
    let service = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let service_addr = service.local_addr().unwrap();
    let mut peer = TcpStream::connect(service_addr).await.unwrap();
    let (accepted, remote) = service.accept().await.unwrap();
    let local = accepted.local_addr().unwrap();

    // GIVEN: identd reports the service user for any pair
    let identity = ServerIdentity::new("svc", Some(4242));
    let server = FakeIdentServer::start(|query| Some(userid_reply(query, "UNIX", "svc"))).await;
    let client = IdentClient::new(server.config(2));

    // WHEN: Querying for the accepted connection and deciding
    let endpoints = ident_core::Endpoints::new(local, remote);
    let result = client.query_async(endpoints, None).await;
    let decision = SameUserEvaluator::new(&identity).check(&result);

    // THEN: Same user, 200, and identd was asked about (peer port, service port)
    assert_eq!(decision, AccessDecision::SameUser);
    assert_eq!(decision.status(), HttpStatusCode::OK);
    assert_eq!(
        server.queries(),
        vec![format!("{},{}\r\n", remote.port(), local.port())]
    );

    let _ = peer.shutdown().await;
}

/// **VALUE**: Verifies another local user is denied with 403.
#[tokio::test]
async fn given_loopback_connection_owned_by_other_user_when_checking_then_forbidden() {
    let identity = ServerIdentity::new("svc", Some(4242));
    let server = FakeIdentServer::start(|query| Some(userid_reply(query, "UNIX", "mallory"))).await;
    let client = IdentClient::new(server.config(2));

    let response = client.fetch(loopback_endpoints(3000, 40000), None).await;
    let decision = SameUserEvaluator::new(&identity).decide(&response);

    assert_eq!(decision, AccessDecision::OtherUser);
    assert_eq!(decision.status(), HttpStatusCode::FORBIDDEN);
}

/// **VALUE**: Verifies identd answering with the numeric uid still counts as same user.
#[tokio::test]
async fn given_ident_reply_with_numeric_uid_when_checking_then_allowed() {
    let identity = ServerIdentity::new("svc", Some(4242));
    let server = FakeIdentServer::start(|query| Some(userid_reply(query, "UNIX", "4242"))).await;
    let client = IdentClient::new(server.config(2));

    let response = client.fetch(loopback_endpoints(3000, 40000), None).await;

    assert!(SameUserEvaluator::new(&identity).same_user(&response));
}

/// **VALUE**: Verifies an ident failure maps to 500 and never to access.
///
/// **BUG THIS CATCHES**: Would catch a failed lookup falling through to "allowed", the
/// most dangerous possible failure mode of this crate.
#[tokio::test]
async fn given_ident_error_reply_when_checking_then_failed_with_server_error_status() {
    let identity = ServerIdentity::new("svc", Some(4242));
    let server = FakeIdentServer::start(|query| Some(error_reply(query, "NO-USER"))).await;
    let client = IdentClient::new(server.config(2));

    let result = client.query_async(loopback_endpoints(3000, 40000), None).await;
    let decision = SameUserEvaluator::new(&identity).check(&result);

    assert_eq!(decision, AccessDecision::Failed(ErrorKind::Protocol));
    assert!(!decision.is_allowed());
    assert_eq!(decision.status(), HttpStatusCode::INTERNAL_SERVER_ERROR);
}

/// **VALUE**: Verifies the process identity resolves on the test host and is stable.
#[test]
fn given_test_process_when_initializing_identity_then_same_instance_every_time() {
    let first = ServerIdentity::init().expect("Cannot resolve test user");
    let second = ServerIdentity::init().expect("Cannot resolve test user");

    assert!(!first.username().is_empty());
    assert!(std::ptr::eq(first, second));
}
