//! # Venue Canon Common Library
//!
//! Shared code for the venue canonicalization service and its offline tools:
//! - Error type used by every collaborator
//! - Bootstrap configuration (TOML) and root folder resolution
//! - Database initialization and row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
