//! RFC 1413 wire format: the query line we send and the reply line we parse.
//!
//! A query names the connection by its two ports as the *remote* host sees them:
//! first the port on the remote host (our peer's end), then the port on this host.
//!
//! ```text
//! query:  6193,23\r\n
//! reply:  6193 , 23 : USERID : UNIX : stjohns
//! reply:  6195 , 23 : ERROR : NO-USER
//! ```

use crate::error::ident::IdentError;

use common::ErrorLocation;

use models::{ErrorToken, PortPair};

use std::sync::OnceLock;

use regex::Regex;

/// Well-known ident port.
pub const DEFAULT_IDENT_PORT: u16 = 113;

/// Longest reply line accepted, terminator excluded.
pub const MAX_REPLY_LEN: usize = 1000;

const REPLY_PATTERN: &str =
    r"^\s*(?P<server>\d+)\s*,\s*(?P<client>\d+)\s*:\s*(?P<kind>[A-Za-z-]+)\s*:(?P<rest>.*)$";
const REPLY_CAPTURE_SERVER: &str = "server";
const REPLY_CAPTURE_CLIENT: &str = "client";
const REPLY_CAPTURE_KIND: &str = "kind";
const REPLY_CAPTURE_REST: &str = "rest";

static REPLY_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_reply_regex() -> &'static Regex {
    REPLY_REGEX.get_or_init(|| Regex::new(REPLY_PATTERN).expect("valid regex pattern"))
}

/// A reply that parsed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    UserId {
        os: String,
        charset: Option<String>,
        username: String,
    },
    Error {
        token: ErrorToken,
    },
}

/// Render the query line, CRLF included.
pub fn format_query(port_pair: PortPair) -> String {
    format!("{},{}\r\n", port_pair.server_port, port_pair.client_port)
}

/// Reject port pairs no ident server can answer for, before any I/O happens.
#[track_caller]
pub fn validate_port_pair(port_pair: PortPair) -> Result<(), IdentError> {
    if port_pair.server_port == 0 || port_pair.client_port == 0 {
        return Err(IdentError::Protocol {
            message: format!("Port pair {port_pair} contains port 0"),
            token: Some(ErrorToken::InvalidPort),
            location: ErrorLocation::here(),
        });
    }

    Ok(())
}

/// Parse one reply line (terminator optional) for the query `expected`.
///
/// The username is everything after the third colon, trimmed; it is not otherwise
/// validated and may itself contain colons. Empty user or os fields and mismatched
/// port pairs are protocol errors.
#[track_caller]
pub fn parse_reply(line: &str, expected: PortPair) -> Result<Reply, IdentError> {
    let line = line.trim_end_matches(['\r', '\n']);

    if line.len() > MAX_REPLY_LEN {
        return Err(IdentError::protocol(format!(
            "Reply is {} bytes, longer than {MAX_REPLY_LEN}",
            line.len()
        )));
    }

    let caps = get_reply_regex()
        .captures(line)
        .ok_or_else(|| IdentError::protocol(format!("Malformed reply: {line:?}")))?;

    let server_port = parse_reply_port(&caps[REPLY_CAPTURE_SERVER])?;
    let client_port = parse_reply_port(&caps[REPLY_CAPTURE_CLIENT])?;
    let received = PortPair::new(server_port, client_port);

    if received != expected {
        return Err(IdentError::protocol(format!(
            "Reply is for port pair {received}, queried {expected}"
        )));
    }

    let rest = &caps[REPLY_CAPTURE_REST];

    match caps[REPLY_CAPTURE_KIND].to_ascii_uppercase().as_str() {
        "USERID" | "USERINFO" => parse_user_id(rest),
        "ERROR" => {
            let token = rest.trim();
            if token.is_empty() {
                return Err(IdentError::protocol("ERROR reply carries no error token"));
            }
            Ok(Reply::Error {
                token: ErrorToken::parse(token),
            })
        }
        other => Err(IdentError::protocol(format!("Unknown reply type '{other}'"))),
    }
}

#[track_caller]
fn parse_user_id(rest: &str) -> Result<Reply, IdentError> {
    let (opsys_field, username) = rest
        .split_once(':')
        .ok_or_else(|| IdentError::protocol("USERID reply has no user field"))?;

    let (os, charset) = match opsys_field.split_once(',') {
        Some((os, charset)) => (os.trim(), Some(charset.trim())),
        None => (opsys_field.trim(), None),
    };
    let username = username.trim();

    if os.is_empty() {
        return Err(IdentError::protocol("USERID reply has an empty os field"));
    }

    if username.is_empty() {
        return Err(IdentError::protocol("USERID reply has an empty user field"));
    }

    Ok(Reply::UserId {
        os: os.to_string(),
        charset: charset.filter(|c| !c.is_empty()).map(str::to_string),
        username: username.to_string(),
    })
}

#[track_caller]
fn parse_reply_port(digits: &str) -> Result<u16, IdentError> {
    digits
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| IdentError::protocol(format!("Invalid port '{digits}' in reply")))
}
