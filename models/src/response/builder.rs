use crate::error::model_error::ModelError;
use crate::response::Outcome;
use crate::{ErrorLocation, IdentResponse, PortPair, ResponseError};

use std::net::IpAddr;

/// Builder for validated [`IdentResponse`] values.
///
/// A response is either a user (`with_user` + `with_os`) or an error (`with_error`),
/// never both. Empty user or os fields are rejected: an ident server that answers
/// `USERID` with nothing in it has not identified anybody.
#[derive(Debug, Default)]
pub struct IdentResponseBuilder {
    port_pair: Option<PortPair>,
    remote_address: Option<IpAddr>,
    username: Option<String>,
    os: Option<String>,
    charset: Option<String>,
    error: Option<ResponseError>,
}

impl IdentResponseBuilder {
    pub fn with_port_pair(mut self, port_pair: PortPair) -> Self {
        self.port_pair = Some(port_pair);
        self
    }

    pub fn with_remote_address(mut self, address: IpAddr) -> Self {
        self.remote_address = Some(address);
        self
    }

    pub fn with_user(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_error(mut self, error: ResponseError) -> Self {
        self.error = Some(error);
        self
    }

    /// Build the response with validation.
    #[track_caller]
    pub fn build(self) -> Result<IdentResponse, ModelError> {
        let port_pair = self.port_pair.ok_or_else(|| ModelError::Validation {
            message: String::from("Port pair is required"),
            location: ErrorLocation::here(),
        })?;

        let remote_address = self.remote_address.ok_or_else(|| ModelError::Validation {
            message: String::from("Remote address is required"),
            location: ErrorLocation::here(),
        })?;

        if let Some(error) = self.error {
            if self.username.is_some() || self.os.is_some() {
                return Err(ModelError::Validation {
                    message: String::from("Response cannot carry both user info and an error"),
                    location: ErrorLocation::here(),
                });
            }

            return Ok(IdentResponse {
                port_pair,
                remote_address,
                outcome: Outcome::Failure(error),
            });
        }

        let username = self.username.ok_or_else(|| ModelError::Validation {
            message: String::from("Username is required"),
            location: ErrorLocation::here(),
        })?;

        if username.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Username cannot be empty"),
                location: ErrorLocation::here(),
            });
        }

        let os = self.os.ok_or_else(|| ModelError::Validation {
            message: String::from("Operating system is required"),
            location: ErrorLocation::here(),
        })?;

        if os.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Operating system cannot be empty"),
                location: ErrorLocation::here(),
            });
        }

        let charset = self.charset.filter(|c| !c.is_empty());

        Ok(IdentResponse {
            port_pair,
            remote_address,
            outcome: Outcome::Success {
                username,
                os,
                charset,
            },
        })
    }
}
