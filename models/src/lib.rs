//! Domain models for ident lookups.
//!
//! Pure data structures: what an ident server told us (or why it could not),
//! with no networking or trust logic. Those live in `ident-core`.

pub mod error;
pub mod response;

pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use response::builder::IdentResponseBuilder;
pub use response::{ErrorKind, ErrorToken, IdentResponse, PortPair, ResponseError};

#[cfg(test)]
mod tests;
