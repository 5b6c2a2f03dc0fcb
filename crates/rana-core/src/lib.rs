//! Rana Core - Domain models, error taxonomy, configuration and ports
//!
//! This crate contains the remote payload models, the collaborator contracts
//! (ports) and the layered configuration shared by every other Rana crate.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{extract_error_message, RanaError, Result};
