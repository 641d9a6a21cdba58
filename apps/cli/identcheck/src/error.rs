use common::ErrorLocation;

use ident_core::{ConfigError, IdentError, IdentityError};

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the `identcheck` binary.
///
/// Library errors are flattened to their message so the whole enum stays
/// serializable for `--json` output, but the location is always kept.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum IdentcheckError {
    /// Error from this app (logging, arguments, sockets)
    #[error("Identcheck Error: {message} {location}")]
    Identcheck {
        message: String,
        location: ErrorLocation,
    },

    /// Error from ident-core (query, identity, config)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// The process identity could not be determined
    #[error("Identity Error: {message} {location}")]
    Identity {
        message: String,
        location: ErrorLocation,
    },

    /// Config file or environment override is invalid
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },
}

impl IdentcheckError {
    #[track_caller]
    pub fn identcheck(message: impl Into<String>) -> Self {
        IdentcheckError::Identcheck {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }
}

impl From<IdentError> for IdentcheckError {
    #[track_caller]
    fn from(error: IdentError) -> Self {
        IdentcheckError::Core {
            message: error.to_string(),
            location: ErrorLocation::here(),
        }
    }
}

impl From<IdentityError> for IdentcheckError {
    #[track_caller]
    fn from(error: IdentityError) -> Self {
        IdentcheckError::Identity {
            message: error.to_string(),
            location: ErrorLocation::here(),
        }
    }
}

impl From<ConfigError> for IdentcheckError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        IdentcheckError::Config {
            message: error.to_string(),
            location: ErrorLocation::here(),
        }
    }
}

impl From<std::io::Error> for IdentcheckError {
    #[track_caller]
    fn from(error: std::io::Error) -> Self {
        IdentcheckError::identcheck(format!("I/O error: {error}"))
    }
}
