//! The same-user decision: is the peer of a connection the account running this service?
//!
//! Ident is trusted only for connections that never left this host, so the remote
//! address must be exactly `127.0.0.1`. Other loopback forms (`::1`, `127.0.0.2`,
//! IPv4-mapped addresses) are not accepted.
//!
//! [`SameUserEvaluator::same_user`] is pure; callers that want to remember the answer
//! for a session do so themselves.

use crate::error::ident::IdentError;
use crate::error::identity::IdentityError;
use crate::identity::ServerIdentity;

use common::HttpStatusCode;
use models::{ErrorKind, IdentResponse};

use std::net::{IpAddr, Ipv4Addr};

use log::trace;

pub const LOOPBACK_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Outcome of guarding a request with the same-user check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    SameUser,
    OtherUser,
    Failed(ErrorKind),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::SameUser)
    }

    /// 200 for the same user, 403 for anybody else, 500 when ident itself failed.
    pub fn status(&self) -> HttpStatusCode {
        match self {
            AccessDecision::SameUser => HttpStatusCode::OK,
            AccessDecision::OtherUser => HttpStatusCode::FORBIDDEN,
            AccessDecision::Failed(_) => HttpStatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SameUserEvaluator<'a> {
    identity: &'a ServerIdentity,
}

impl SameUserEvaluator<'static> {
    /// Evaluator for the process identity, resolving it on first use.
    pub fn initialize() -> Result<Self, IdentityError> {
        Ok(Self {
            identity: ServerIdentity::init()?,
        })
    }
}

impl<'a> SameUserEvaluator<'a> {
    pub fn new(identity: &'a ServerIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &ServerIdentity {
        self.identity
    }

    /// True when `response` identifies the local service user on a loopback connection.
    ///
    /// Failed responses are never the same user. The username must match exactly, or,
    /// when the local uid is known, consist only of ASCII digits whose value is that uid.
    pub fn same_user(&self, response: &IdentResponse) -> bool {
        let Some(username) = response.username() else {
            return false;
        };

        if response.remote_address() != LOOPBACK_ADDRESS {
            trace!(
                "Same-user check rejected non-loopback peer {}",
                response.remote_address()
            );
            return false;
        }

        if username == self.identity.username() {
            return true;
        }

        match self.identity.uid() {
            Some(uid) => is_numeric(username) && username.parse::<u32>().is_ok_and(|n| n == uid),
            None => false,
        }
    }

    /// Decision for a response delivered by the non-blocking path.
    pub fn decide(&self, response: &IdentResponse) -> AccessDecision {
        match response.error_kind() {
            Some(kind) => AccessDecision::Failed(kind),
            None if self.same_user(response) => AccessDecision::SameUser,
            None => AccessDecision::OtherUser,
        }
    }

    /// Decision for the outcome of a blocking or awaited query.
    pub fn check(&self, result: &Result<IdentResponse, IdentError>) -> AccessDecision {
        match result {
            Ok(response) => self.decide(response),
            Err(e) => AccessDecision::Failed(e.kind()),
        }
    }
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
