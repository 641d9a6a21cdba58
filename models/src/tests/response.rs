use crate::{ErrorKind, ErrorToken, IdentResponseBuilder, PortPair, ResponseError};

use std::net::{IpAddr, Ipv4Addr};

/// **VALUE**: Verifies that a success renders back as an RFC 1413 USERID reply line.
///
/// **WHY THIS MATTERS**: The CLI prints this form and operators compare it to what
/// their identd logs.
///
/// **BUG THIS CATCHES**: Would catch field order mistakes (os and user swapped).
#[test]
fn given_success_when_displayed_then_renders_userid_line() {
    // GIVEN: A successful response with a charset
    let response = IdentResponseBuilder::default()
        .with_port_pair(PortPair::new(6193, 23))
        .with_remote_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_user("stjohns")
        .with_os("UNIX")
        .with_charset("US-ASCII")
        .build()
        .unwrap();

    // WHEN: Rendering
    let line = response.to_string();

    // THEN: Reply-line layout
    assert_eq!(line, "6193 , 23 : USERID : UNIX,US-ASCII : stjohns");
}

/// **VALUE**: Verifies that server-reported errors render as ERROR reply lines and
/// transport failures render their message.
#[test]
fn given_failures_when_displayed_then_render_by_kind() {
    let address = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

    let protocol = IdentResponseBuilder::default()
        .with_port_pair(PortPair::new(6195, 23))
        .with_remote_address(address)
        .with_error(ResponseError::server_reported(ErrorToken::NoUser))
        .build()
        .unwrap();
    assert_eq!(protocol.to_string(), "6195 , 23 : ERROR : NO-USER");

    let transport = IdentResponseBuilder::default()
        .with_port_pair(PortPair::new(6195, 23))
        .with_remote_address(address)
        .with_error(ResponseError::new(ErrorKind::Transport, "connection refused"))
        .build()
        .unwrap();
    assert_eq!(transport.to_string(), "transport error: connection refused");
}

/// **VALUE**: Verifies RFC tokens are recognized case-insensitively and extension
/// tokens survive verbatim.
///
/// **BUG THIS CATCHES**: Would catch an `X-` token being collapsed into UNKNOWN-ERROR.
#[test]
fn given_error_tokens_when_parsed_then_map_to_variants() {
    // GIVEN/WHEN/THEN: Known and unknown tokens
    assert_eq!(ErrorToken::parse("INVALID-PORT"), ErrorToken::InvalidPort);
    assert_eq!(ErrorToken::parse(" no-user "), ErrorToken::NoUser);
    assert_eq!(ErrorToken::parse("HIDDEN-USER"), ErrorToken::HiddenUser);
    assert_eq!(ErrorToken::parse("UNKNOWN-ERROR"), ErrorToken::UnknownError);
    assert_eq!(
        ErrorToken::parse("X-RATE-LIMITED"),
        ErrorToken::Other(String::from("X-RATE-LIMITED"))
    );
}

/// **VALUE**: Verifies the JSON shape the CLI emits with `--json`.
///
/// **WHY THIS MATTERS**: Scripts consume this output; the status tag and flattened
/// fields are its contract.
#[test]
fn given_responses_when_serialized_then_status_is_tagged() {
    // GIVEN: One success and one failure
    let success = IdentResponseBuilder::default()
        .with_port_pair(PortPair::new(113, 40000))
        .with_remote_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_user("foo")
        .with_os("AwesomeOS")
        .build()
        .unwrap();
    let failure = IdentResponseBuilder::default()
        .with_port_pair(PortPair::new(113, 40000))
        .with_remote_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_error(ResponseError::server_reported(ErrorToken::HiddenUser))
        .build()
        .unwrap();

    // WHEN: Serializing
    let success_json: serde_json::Value = serde_json::to_value(&success).unwrap();
    let failure_json: serde_json::Value = serde_json::to_value(&failure).unwrap();

    // THEN: Tagged, flattened
    assert_eq!(success_json["status"], "success");
    assert_eq!(success_json["username"], "foo");
    assert_eq!(success_json["os"], "AwesomeOS");
    assert_eq!(success_json["remote_address"], "127.0.0.1");

    assert_eq!(failure_json["status"], "failure");
    assert_eq!(failure_json["kind"], "protocol");
    assert_eq!(failure_json["token"], "HIDDEN-USER");
}
