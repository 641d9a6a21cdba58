// Unit tests for the same-user decision

use crate::error::ident::IdentError;
use crate::identity::ServerIdentity;
use crate::same_user::{AccessDecision, SameUserEvaluator};

use common::HttpStatusCode;
use models::{ErrorKind, ErrorToken, IdentResponse, IdentResponseBuilder, PortPair, ResponseError};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

fn response_from(address: IpAddr, username: &str) -> IdentResponse {
    IdentResponseBuilder::default()
        .with_port_pair(PortPair::new(40000, 3000))
        .with_remote_address(address)
        .with_user(username)
        .with_os("UNIX")
        .build()
        .unwrap()
}

fn loopback(username: &str) -> IdentResponse {
    response_from(IpAddr::V4(Ipv4Addr::LOCALHOST), username)
}

fn identity() -> ServerIdentity {
    ServerIdentity::new("joe", Some(1000))
}

/// **VALUE**: Verifies the core positive case: loopback peer, exact username.
///
/// **WHY THIS MATTERS**: This is the only path by which a guarded route opens for a
/// named user.
#[test]
fn given_loopback_and_matching_username_when_evaluated_then_same_user() {
    // GIVEN: Evaluator for "joe" and a loopback response naming "joe"
    let identity = identity();
    let evaluator = SameUserEvaluator::new(&identity);

    // WHEN/THEN: Same user
    assert!(evaluator.same_user(&loopback("joe")));
}

/// **VALUE**: Verifies the locality gate beats an exact username match.
///
/// **WHY THIS MATTERS**: Any remote host can run an ident server that claims any name.
/// Only loopback connections stay within this host.
///
/// **BUG THIS CATCHES**: Would catch the address check being skipped, reordered after the
/// name check, or widened to other loopback spellings.
#[test]
fn given_non_loopback_peer_with_matching_name_when_evaluated_then_not_same_user() {
    // GIVEN: Matching usernames from non-127.0.0.1 addresses
    let identity = identity();
    let evaluator = SameUserEvaluator::new(&identity);
    let addresses = vec![
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)),
        IpAddr::V6(Ipv6Addr::LOCALHOST),
        IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped()),
    ];

    for address in addresses {
        // WHEN: Evaluating
        let same = evaluator.same_user(&response_from(address, "joe"));

        // THEN: Rejected
        assert!(!same, "Peer {address} must not pass the locality gate");
    }
}

/// **VALUE**: Verifies the numeric-uid fallback, including leading zeros.
///
/// **WHY THIS MATTERS**: Some ident servers report the uid instead of the login name.
#[test]
fn given_numeric_username_when_evaluated_then_compared_against_uid() {
    let identity = identity();
    let evaluator = SameUserEvaluator::new(&identity);

    assert!(evaluator.same_user(&loopback("1000")));
    assert!(evaluator.same_user(&loopback("01000")));
    assert!(!evaluator.same_user(&loopback("1001")));
    assert!(!evaluator.same_user(&loopback("99999999999999999999")));
    assert!(!evaluator.same_user(&loopback("+1000")));
    assert!(!evaluator.same_user(&loopback("1000 ")));
}

/// **VALUE**: Verifies numeric usernames never match when the platform has no uid.
#[test]
fn given_identity_without_uid_when_numeric_username_then_not_same_user() {
    let identity = ServerIdentity::new("joe", None);
    let evaluator = SameUserEvaluator::new(&identity);

    assert!(!evaluator.same_user(&loopback("1000")));
    assert!(!evaluator.same_user(&loopback("0")));
}

/// **VALUE**: Verifies the comparison is exact (case and whitespace sensitive).
#[test]
fn given_near_miss_usernames_when_evaluated_then_not_same_user() {
    let identity = identity();
    let evaluator = SameUserEvaluator::new(&identity);

    for name in ["Joe", "joe2", "jo", "root"] {
        assert!(!evaluator.same_user(&loopback(name)), "{name}");
    }
}

/// **VALUE**: Verifies failed responses yield false, not a panic or error.
///
/// **BUG THIS CATCHES**: Would catch an `unwrap()` on the username of a failed response.
#[test]
fn given_failed_response_when_evaluated_then_not_same_user() {
    // GIVEN: A loopback failure
    let identity = identity();
    let evaluator = SameUserEvaluator::new(&identity);
    let failed = IdentResponse::failure(
        PortPair::new(40000, 3000),
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        ResponseError::server_reported(ErrorToken::NoUser),
    );

    // WHEN/THEN: False and a failed decision
    assert!(!evaluator.same_user(&failed));
    assert_eq!(
        evaluator.decide(&failed),
        AccessDecision::Failed(ErrorKind::Protocol)
    );
}

/// **VALUE**: Verifies repeated evaluation is stable.
#[test]
fn given_same_response_when_evaluated_twice_then_same_answer() {
    let identity = identity();
    let evaluator = SameUserEvaluator::new(&identity);

    for response in [loopback("joe"), loopback("mallory")] {
        let first = evaluator.same_user(&response);
        let second = evaluator.same_user(&response);
        assert_eq!(first, second);
    }
}

/// **VALUE**: Verifies the status mapping hosts render for each decision.
///
/// **WHY THIS MATTERS**: A request error rendered as 403 hides outages; a denial rendered
/// as 500 pages somebody at night.
#[test]
fn given_query_outcomes_when_checked_then_map_to_statuses() {
    // GIVEN: Evaluator and three outcomes
    let identity = identity();
    let evaluator = SameUserEvaluator::new(&identity);
    let same: Result<IdentResponse, IdentError> = Ok(loopback("joe"));
    let other: Result<IdentResponse, IdentError> = Ok(loopback("mallory"));
    let failed: Result<IdentResponse, IdentError> = Err(IdentError::transport("refused"));

    // WHEN: Checking
    let decisions = [
        evaluator.check(&same),
        evaluator.check(&other),
        evaluator.check(&failed),
    ];

    // THEN: 200 / 403 / 500
    assert_eq!(decisions[0], AccessDecision::SameUser);
    assert!(decisions[0].is_allowed());
    assert_eq!(decisions[0].status(), HttpStatusCode::OK);
    assert_eq!(decisions[1].status(), HttpStatusCode::FORBIDDEN);
    assert_eq!(
        decisions[2],
        AccessDecision::Failed(ErrorKind::Transport)
    );
    assert_eq!(decisions[2].status(), HttpStatusCode::INTERNAL_SERVER_ERROR);
}
