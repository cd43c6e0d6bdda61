//! venue-canon library - venue name canonicalization
//!
//! Maps the free-text venue names reported by event providers onto a registry
//! of canonical venues: alias lookup first, fuzzy matching second, and an
//! unmatched queue for curators when neither applies.

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use venue_common::config::TomlConfig;

pub mod api;
pub mod curation;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod sheets;

pub use error::{ApiError, ApiResult};

use engine::{Resolver, ResolverConfig, VenueStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Registry, alias and queue collaborator
    pub store: Arc<dyn VenueStore>,
    /// Resolution Orchestrator bound to `store`
    pub resolver: Resolver,
    pub config: Arc<TomlConfig>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create application state, building the resolver from `config.matching`
    pub fn new(store: Arc<dyn VenueStore>, config: TomlConfig) -> venue_common::Result<Self> {
        let resolver = Resolver::new(store.clone(), ResolverConfig::from_matching(&config.matching)?);
        Ok(Self {
            store,
            resolver,
            config: Arc::new(config),
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/standardize", post(api::standardize))
        .route("/api/unmatched", get(api::list_unmatched))
        .route("/api/aliases", post(api::add_alias))
        .route("/api/venues", post(api::upsert_venue))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
