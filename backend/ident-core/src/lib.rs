pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod same_user;

#[cfg(test)]
mod tests;

pub use client::{Endpoints, IdentClient};
pub use config::IdentConfig;
pub use error::{ConfigError, IdentError, IdentityError};
pub use identity::ServerIdentity;
pub use same_user::{AccessDecision, SameUserEvaluator};

pub const IDENT_ENV_PREFIX: &str = "IDENT_";
pub const IDENT_PORT_ENV: &str = const_format::concatcp!(IDENT_ENV_PREFIX, "PORT");
pub const IDENT_TIMEOUT_SECS_ENV: &str = const_format::concatcp!(IDENT_ENV_PREFIX, "TIMEOUT_SECS");
