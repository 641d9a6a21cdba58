//! The account this service runs as.
//!
//! Resolved once per process and read-only afterwards. Resolution failure is an
//! initialization error: without a local identity no same-user decision can be made.

use crate::error::identity::IdentityError;

use std::sync::OnceLock;

use log::{debug, info, warn};
use serde::Serialize;

/// Environment variables consulted, in order, when the user database has no answer.
pub const USERNAME_ENV_VARS: &[&str] = &["USER", "LOGNAME", "USERNAME"];

static SERVER_IDENTITY: OnceLock<ServerIdentity> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerIdentity {
    username: String,
    uid: Option<u32>,
}

impl ServerIdentity {
    pub fn new(username: impl Into<String>, uid: Option<u32>) -> Self {
        Self {
            username: username.into(),
            uid,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Numeric user id; `None` on platforms without one.
    pub fn uid(&self) -> Option<u32> {
        self.uid
    }

    /// Look up the current user without memoizing.
    ///
    /// On Unix the password database is asked for the real uid's entry; when it has
    /// none, the name falls back to [`USERNAME_ENV_VARS`].
    #[track_caller]
    pub fn resolve() -> Result<Self, IdentityError> {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    #[track_caller]
    pub(crate) fn resolve_with<F>(env: F) -> Result<Self, IdentityError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uid = current_uid();

        if let Some(name) = lookup_username(uid) {
            return Ok(Self::new(name, uid));
        }

        debug!("No user database entry for uid {uid:?}, falling back to environment");

        let name = username_from_env(env).ok_or_else(|| {
            IdentityError::unresolved(format!(
                "Cannot determine local username (uid {uid:?}, checked {USERNAME_ENV_VARS:?})"
            ))
        })?;

        Ok(Self::new(name, uid))
    }

    /// Resolve on first use and keep the result for the rest of the process.
    ///
    /// Concurrent first calls may each resolve; the first stored value wins.
    pub fn init() -> Result<&'static ServerIdentity, IdentityError> {
        if let Some(identity) = SERVER_IDENTITY.get() {
            return Ok(identity);
        }

        let resolved = Self::resolve()?;
        let identity = SERVER_IDENTITY.get_or_init(|| resolved);

        info!(
            "Local service identity: {} (uid {:?})",
            identity.username, identity.uid
        );

        Ok(identity)
    }

    /// The memoized identity, if [`init`](Self::init) has succeeded.
    pub fn get() -> Option<&'static ServerIdentity> {
        SERVER_IDENTITY.get()
    }
}

pub(crate) fn username_from_env<F>(env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    USERNAME_ENV_VARS
        .iter()
        .filter_map(|var| env(var))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(unix)]
fn current_uid() -> Option<u32> {
    Some(nix::unistd::getuid().as_raw())
}

#[cfg(not(unix))]
fn current_uid() -> Option<u32> {
    None
}

#[cfg(unix)]
fn lookup_username(uid: Option<u32>) -> Option<String> {
    use nix::unistd::{Uid, User};

    let uid = uid?;
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => Some(user.name),
        Ok(None) => None,
        Err(e) => {
            warn!("User database lookup for uid {uid} failed: {e}");
            None
        }
    }
}

#[cfg(not(unix))]
fn lookup_username(_uid: Option<u32>) -> Option<String> {
    None
}
