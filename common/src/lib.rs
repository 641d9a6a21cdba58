//! Shared building blocks for the ident workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error locations and status codes shared by every layer
//! - **models**: ident response data structures
//! - **ident-core**: protocol client, server identity and the same-user decision
//! - **identcheck**: command-line host wiring everything together

pub mod error;
pub mod http_status;

pub use error::error_location::ErrorLocation;
pub use http_status::HttpStatusCode;

#[cfg(test)]
mod tests;
