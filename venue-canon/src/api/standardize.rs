//! Single-item standardization endpoint
//!
//! `POST /standardize` with `{table, event_id, raw_name}`. The table names the
//! provider the event came from; a matched decision is written back to
//! `event_venues` for that provider.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use venue_common::db::VenueId;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Request body; every field is required but checked by hand so that a
/// missing field gets the same 400 body as a blank one
#[derive(Debug, Default, Deserialize)]
pub struct StandardizeRequest {
    pub table: Option<String>,
    /// Provider event id, string or number
    pub event_id: Option<Value>,
    pub raw_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StandardizeResponse {
    /// `null` when the name was queued as unmatched
    pub canonical_id: Option<VenueId>,
    pub processed_at: DateTime<Utc>,
}

/// Validated request fields
struct Validated<'a> {
    table: &'a str,
    event_id: String,
    raw_name: &'a str,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> ApiResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{} is required", field))),
    }
}

fn event_id_text(value: &Option<Value>) -> ApiResult<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ApiError::BadRequest("event_id is required".to_string())),
    }
}

fn validate<'a>(state: &AppState, req: &'a StandardizeRequest) -> ApiResult<Validated<'a>> {
    let table = required(&req.table, "table")?;
    let event_id = event_id_text(&req.event_id)?;
    // Untrimmed; normalization handles whitespace
    let raw_name = match req.raw_name.as_deref() {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(ApiError::BadRequest("raw_name is required".to_string())),
    };

    if !state.config.is_allowed_provider(table) {
        return Err(ApiError::BadRequest(format!("unknown table {:?}", table)));
    }

    Ok(Validated {
        table,
        event_id,
        raw_name,
    })
}

/// POST /standardize
pub async fn standardize(
    State(state): State<AppState>,
    payload: Result<Json<StandardizeRequest>, JsonRejection>,
) -> ApiResult<Json<StandardizeResponse>> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let req = validate(&state, &req)?;

    let decision = state.resolver.resolve(req.raw_name, req.table).await?;
    let processed_at = Utc::now();

    if let Some(canonical_id) = decision.canonical_id {
        state
            .store
            .record_event_venue(req.table, &req.event_id, canonical_id, processed_at)
            .await?;
    }

    info!(
        table = %req.table,
        event_id = %req.event_id,
        raw_name = %req.raw_name,
        stage = ?decision.stage,
        score = decision.score,
        canonical_id = ?decision.canonical_id,
        "Standardized venue"
    );

    Ok(Json(StandardizeResponse {
        canonical_id: decision.canonical_id,
        processed_at,
    }))
}
