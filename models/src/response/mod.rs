pub mod builder;

use serde::{Serialize, Serializer};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::net::IpAddr;

/// The two ports of the connection being identified, as the remote ident server sees them.
///
/// `server_port` is the port on the ident server's host (our peer's side of the
/// connection), `client_port` the port on the querying host (our side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PortPair {
    pub server_port: u16,
    pub client_port: u16,
}

impl PortPair {
    pub fn new(server_port: u16, client_port: u16) -> Self {
        Self {
            server_port,
            client_port,
        }
    }
}

impl Display for PortPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(f, "{} , {}", self.server_port, self.client_port)
    }
}

/// Request-scoped failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Could not reach the ident port (refused, unreachable, bad address).
    Transport,
    /// The exchange did not complete within the timeout.
    Timeout,
    /// The server answered, but with an ERROR reply or something unparseable.
    Protocol,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Protocol => "protocol",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}

/// Error token carried by an `ERROR` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorToken {
    InvalidPort,
    NoUser,
    HiddenUser,
    UnknownError,
    /// `X-` extension tokens and anything else a server sends, verbatim.
    Other(String),
}

impl ErrorToken {
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.to_ascii_uppercase().as_str() {
            "INVALID-PORT" => ErrorToken::InvalidPort,
            "NO-USER" => ErrorToken::NoUser,
            "HIDDEN-USER" => ErrorToken::HiddenUser,
            "UNKNOWN-ERROR" => ErrorToken::UnknownError,
            _ => ErrorToken::Other(token.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorToken::InvalidPort => "INVALID-PORT",
            ErrorToken::NoUser => "NO-USER",
            ErrorToken::HiddenUser => "HIDDEN-USER",
            ErrorToken::UnknownError => "UNKNOWN-ERROR",
            ErrorToken::Other(token) => token,
        }
    }
}

impl Display for ErrorToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Why a query did not produce a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseError {
    pub kind: ErrorKind,
    pub token: Option<ErrorToken>,
    pub message: String,
}

impl ResponseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            token: None,
            message: message.into(),
        }
    }

    /// A protocol error reported by the server itself.
    pub fn server_reported(token: ErrorToken) -> Self {
        Self {
            kind: ErrorKind::Protocol,
            message: format!("ident server replied ERROR : {token}"),
            token: Some(token),
        }
    }
}

impl Display for ResponseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match &self.token {
            Some(token) => write!(f, "{} error ({token}): {}", self.kind, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
    Success {
        username: String,
        os: String,
        charset: Option<String>,
    },
    Failure(ResponseError),
}

/// Result of one ident query, successful or not. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentResponse {
    port_pair: PortPair,
    remote_address: IpAddr,
    #[serde(flatten)]
    outcome: Outcome,
}

impl IdentResponse {
    /// A failed query. Unlike successes this needs no validation.
    pub fn failure(port_pair: PortPair, remote_address: IpAddr, error: ResponseError) -> Self {
        Self {
            port_pair,
            remote_address,
            outcome: Outcome::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    /// Reported user, `None` for failed queries.
    pub fn username(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { username, .. } => Some(username),
            Outcome::Failure(_) => None,
        }
    }

    /// Reported operating system token (e.g. `UNIX`), `None` for failed queries.
    pub fn os(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { os, .. } => Some(os),
            Outcome::Failure(_) => None,
        }
    }

    pub fn charset(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { charset, .. } => charset.as_deref(),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ResponseError> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|e| e.kind)
    }

    /// Address of the peer that was queried.
    pub fn remote_address(&self) -> IpAddr {
        self.remote_address
    }

    pub fn port_pair(&self) -> PortPair {
        self.port_pair
    }
}

impl Display for IdentResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match &self.outcome {
            Outcome::Success {
                username,
                os,
                charset: Some(charset),
            } => write!(
                f,
                "{} : USERID : {os},{charset} : {username}",
                self.port_pair
            ),
            Outcome::Success {
                username,
                os,
                charset: None,
            } => write!(f, "{} : USERID : {os} : {username}", self.port_pair),
            Outcome::Failure(ResponseError {
                kind: ErrorKind::Protocol,
                token: Some(token),
                ..
            }) => write!(f, "{} : ERROR : {token}", self.port_pair),
            Outcome::Failure(error) => write!(f, "{error}"),
        }
    }
}
