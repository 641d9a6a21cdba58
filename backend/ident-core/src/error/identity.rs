use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Raised once, at setup, when the local service user cannot be determined.
#[derive(Debug, ThisError)]
pub enum IdentityError {
    #[error("Identity Unresolved Error: {message} {location}")]
    Unresolved {
        message: String,
        location: ErrorLocation,
    },
}

impl IdentityError {
    #[track_caller]
    pub fn unresolved(message: impl Into<String>) -> Self {
        IdentityError::Unresolved {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }
}
