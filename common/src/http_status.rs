//! Status codes a host uses to report an ident-based access decision.

use serde::Serialize;

/// HTTP-style status code for an access decision.
///
/// Hosts that guard a route with the same-user check translate the decision
/// into one of these before answering the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HttpStatusCode(pub u16);

impl HttpStatusCode {
    /// Caller was identified as the local service user.
    pub const OK: HttpStatusCode = HttpStatusCode(200);
    /// Caller was identified, but as somebody else (or from a remote host).
    pub const FORBIDDEN: HttpStatusCode = HttpStatusCode(403);
    /// The ident exchange itself failed.
    pub const INTERNAL_SERVER_ERROR: HttpStatusCode = HttpStatusCode(500);

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// 4xx client errors.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// 5xx server errors.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    /// Canonical reason phrase, `"Unknown"` for codes this crate never produces.
    pub fn reason(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            403 => "Forbidden",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }
}

impl From<u16> for HttpStatusCode {
    fn from(code: u16) -> Self {
        HttpStatusCode(code)
    }
}

impl std::fmt::Display for HttpStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason())
    }
}
