//! Curation endpoints: unmatched queue review, manual aliases, venues

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use venue_common::db::{AliasSource, AliasWrite, NewCanonicalVenue, UnmatchedVenue, VenueId};

use crate::engine::normalize;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_UNMATCHED_LIMIT: usize = 100;
const MAX_UNMATCHED_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct UnmatchedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct UnmatchedResponse {
    pub entries: Vec<UnmatchedVenue>,
}

/// GET /api/unmatched?limit=N
///
/// Newest first. `limit` defaults to 100 and is capped at 1000.
pub async fn list_unmatched(
    State(state): State<AppState>,
    Query(query): Query<UnmatchedQuery>,
) -> ApiResult<Json<UnmatchedResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_UNMATCHED_LIMIT)
        .min(MAX_UNMATCHED_LIMIT);

    let entries = state.store.unmatched_venues(limit).await?;
    Ok(Json(UnmatchedResponse { entries }))
}

#[derive(Debug, Deserialize)]
pub struct AliasRequest {
    pub raw_name: String,
    pub canonical_id: VenueId,
}

#[derive(Debug, Serialize)]
pub struct AliasResponse {
    /// Normalized key the alias was stored under
    pub raw_name: String,
    pub canonical_id: VenueId,
    pub created: bool,
}

/// POST /api/aliases
///
/// Writes a manual alias, replacing any existing mapping for the key.
pub async fn add_alias(
    State(state): State<AppState>,
    payload: Result<Json<AliasRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AliasResponse>)> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let key = normalize(&req.raw_name);
    if key.is_empty() {
        return Err(ApiError::BadRequest("raw_name is required".to_string()));
    }

    if state.store.canonical_venue(req.canonical_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "canonical venue {}",
            req.canonical_id
        )));
    }

    let outcome = state
        .store
        .upsert_alias_mapping(&key, req.canonical_id, AliasSource::Manual)
        .await?;
    info!(key = %key, canonical_id = req.canonical_id, ?outcome, "Manual alias written");

    let created = outcome == AliasWrite::Inserted;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };

    Ok((
        status,
        Json(AliasResponse {
            raw_name: key,
            canonical_id: req.canonical_id,
            created,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VenueRequest {
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub capacity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct VenueResponse {
    pub id: VenueId,
    pub name: String,
}

/// POST /api/venues
///
/// Upserts by case-insensitive name; city and capacity are overwritten.
pub async fn upsert_venue(
    State(state): State<AppState>,
    payload: Result<Json<VenueRequest>, JsonRejection>,
) -> ApiResult<Json<VenueResponse>> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if matches!(req.capacity, Some(c) if c < 0) {
        return Err(ApiError::BadRequest("capacity must not be negative".to_string()));
    }

    let venue = NewCanonicalVenue {
        name: name.to_string(),
        city: req.city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        capacity: req.capacity,
    };
    let id = state.store.upsert_canonical_venue(&venue).await?;
    info!(id, name = %name, "Canonical venue upserted");

    Ok(Json(VenueResponse {
        id,
        name: venue.name,
    }))
}
