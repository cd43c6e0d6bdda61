//! HTTP API handlers for venue-canon

pub mod curation;
pub mod health;
pub mod standardize;

pub use curation::{add_alias, list_unmatched, upsert_venue};
pub use health::health_routes;
pub use standardize::standardize;
