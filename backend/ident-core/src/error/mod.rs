pub mod config;
pub mod ident;
pub mod identity;

pub use config::ConfigError;
pub use ident::IdentError;
pub use identity::IdentityError;
