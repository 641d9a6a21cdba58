//! Request-scoped ident failures.
//!
//! - Transport: the ident port could not be reached
//! - Timeout: the exchange did not finish in time
//! - Protocol: the server answered ERROR or something unparseable
//!
//! All variants carry an ErrorLocation captured with `#[track_caller]`.

use common::ErrorLocation;
use models::{ErrorKind, ErrorToken, IdentResponse, ModelError, ResponseError};

use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::time::Duration;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum IdentError {
    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        token: Option<ErrorToken>,
        location: ErrorLocation,
    },
}

impl IdentError {
    #[track_caller]
    pub fn transport(message: impl Into<String>) -> Self {
        IdentError::Transport {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn timeout(timeout: Duration) -> Self {
        IdentError::Timeout {
            message: format!("no ident reply within {timeout:?}"),
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn protocol(message: impl Into<String>) -> Self {
        IdentError::Protocol {
            message: message.into(),
            token: None,
            location: ErrorLocation::here(),
        }
    }

    /// The server answered with `ERROR : <token>`.
    #[track_caller]
    pub fn server_reported(token: ErrorToken) -> Self {
        IdentError::Protocol {
            message: format!("ident server replied ERROR : {token}"),
            token: Some(token),
            location: ErrorLocation::here(),
        }
    }

    /// Map an I/O failure, keeping timeouts distinct from other transport errors.
    #[track_caller]
    pub fn from_io(context: &str, error: &IoError, timeout: Duration) -> Self {
        if error.kind() == IoErrorKind::TimedOut {
            return IdentError::timeout(timeout);
        }

        IdentError::transport(format!("{context}: {error}"))
    }

    /// Recover the error carried by a failed response; `None` for successes.
    #[track_caller]
    pub fn from_response(response: &IdentResponse) -> Option<Self> {
        let error = response.error()?;
        let location = ErrorLocation::here();

        Some(match error.kind {
            ErrorKind::Transport => IdentError::Transport {
                message: error.message.clone(),
                location,
            },
            ErrorKind::Timeout => IdentError::Timeout {
                message: error.message.clone(),
                location,
            },
            ErrorKind::Protocol => IdentError::Protocol {
                message: error.message.clone(),
                token: error.token.clone(),
                location,
            },
        })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentError::Transport { .. } => ErrorKind::Transport,
            IdentError::Timeout { .. } => ErrorKind::Timeout,
            IdentError::Protocol { .. } => ErrorKind::Protocol,
        }
    }

    /// Server-reported error token, if the server sent one.
    pub fn token(&self) -> Option<&ErrorToken> {
        match self {
            IdentError::Protocol { token, .. } => token.as_ref(),
            _ => None,
        }
    }

    /// Data-only form stored in a failed [`IdentResponse`].
    pub fn to_response_error(&self) -> ResponseError {
        match self {
            IdentError::Transport { message, .. } => {
                ResponseError::new(ErrorKind::Transport, message.clone())
            }
            IdentError::Timeout { message, .. } => {
                ResponseError::new(ErrorKind::Timeout, message.clone())
            }
            IdentError::Protocol { message, token, .. } => ResponseError {
                kind: ErrorKind::Protocol,
                token: token.clone(),
                message: message.clone(),
            },
        }
    }
}

impl From<IoError> for IdentError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        IdentError::Transport {
            message: error.to_string(),
            location: ErrorLocation::here(),
        }
    }
}

impl From<ModelError> for IdentError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        IdentError::Protocol {
            message: error.to_string(),
            token: None,
            location: ErrorLocation::here(),
        }
    }
}
