//! # Microsoft Token Agent Library
//!
//! Obtains an OAuth2 client-credentials bearer token from the Microsoft
//! identity platform, caches it until shortly before it expires, and hands
//! it out to any number of concurrent callers with at most one refresh in
//! flight.
//!
//! Modules:
//! - `config`: settings file, credentials from the environment, validation
//! - `sources`: the client-credentials exchange against the login URL
//! - `parser`: token response and JWT claim decoding
//! - `cache`: single-slot token cache with single-flight refresh
//! - `gate`: consumer facade over the cache
//! - `server`: token and metrics HTTP endpoints

pub mod config;
pub mod cache;
pub mod error;
pub mod gate;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod utils;
pub mod validator;

#[cfg(test)]
pub mod tests;

pub use crate::error::AuthError;
pub use crate::gate::auth_gate::AuthGate;
