//! Rana Client - HTTP adapters for the remote services
//!
//! This crate implements the remote ports of `rana-core` on top of reqwest:
//! the hydraulic modelling (3Di) revision API and the Rana project API.

pub mod auth;
mod http;
pub mod rana;
pub mod threedi;

// Re-export main types
pub use auth::{EnvToken, StaticToken};
pub use rana::RanaClient;
pub use threedi::ThreediClient;
