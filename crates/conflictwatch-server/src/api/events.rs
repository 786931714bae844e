//! Event CRUD and filtered listing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use conflictwatch_core::{
    filter::DEFAULT_QUERY_LIMIT, ConflictEvent, EventPatch, FilterSpec, NewConflictEvent, Severity,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_core_error, map_store_error, ApiError, ApiResponse, AppState};

/// Query-string form of [`FilterSpec`]. Sets are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub(super) struct EventsQuery {
    pub severity: Option<String>,
    pub event_type: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

pub(super) fn normalize_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_QUERY_LIMIT)
        .clamp(1, DEFAULT_QUERY_LIMIT)
}

impl EventsQuery {
    /// Build a validated filter. `limit` is carried through as given; callers
    /// decide whether it applies.
    pub(super) fn to_filter(&self, req_id: &str, limit: usize) -> Result<FilterSpec, ApiError> {
        let severities = split_csv(self.severity.as_deref())
            .iter()
            .map(|s| s.parse::<Severity>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_core_error(req_id, &e))?;

        let mut filter = FilterSpec::default()
            .with_severities(severities)
            .with_event_types(split_csv(self.event_type.as_deref()))
            .with_countries(split_csv(self.country.as_deref()))
            .between(self.start, self.end)
            .with_limit(limit);
        if let Some(region) = self.region.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            filter = filter.with_region(region);
        }

        filter.validate().map_err(|e| map_core_error(req_id, &e))?;
        Ok(filter)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkRequest {
    pub events: Vec<NewConflictEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct BulkParams {
    /// Refresh by natural key instead of appending.
    #[serde(default)]
    pub dedupe: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct BulkResponse {
    pub inserted: usize,
    pub updated: usize,
}

/// GET /api/v1/events
pub(super) async fn list_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<ApiResponse<Vec<ConflictEvent>>>, ApiError> {
    let filter = params.to_filter(&req_id.0, normalize_limit(params.limit))?;
    let events = state.store.query(&filter).await;
    Ok(Json(ApiResponse::new(events, req_id.0)))
}

/// GET /api/v1/events/{id}
pub(super) async fn get_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConflictEvent>>, ApiError> {
    let event = state
        .store
        .get(&id)
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;
    Ok(Json(ApiResponse::new(event, req_id.0)))
}

/// POST /api/v1/events
pub(super) async fn create_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewConflictEvent>,
) -> Result<(StatusCode, Json<ApiResponse<ConflictEvent>>), ApiError> {
    body.validate().map_err(|e| map_core_error(&req_id.0, &e))?;
    let event = state.store.insert(body).await;
    tracing::info!(id = %event.id, severity = %event.severity, "api: event created");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(event, req_id.0))))
}

/// POST /api/v1/events/bulk
///
/// The whole batch is validated before anything reaches the store.
pub(super) async fn bulk_create_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<BulkParams>,
    Json(body): Json<BulkRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BulkResponse>>), ApiError> {
    for (index, event) in body.events.iter().enumerate() {
        event.validate().map_err(|e| {
            ApiError::new(
                req_id.0.as_str(),
                "validation_error",
                format!("events[{index}]: {e}"),
            )
        })?;
    }

    let response = if params.dedupe {
        let summary = state.store.bulk_upsert(body.events).await;
        BulkResponse {
            inserted: summary.inserted,
            updated: summary.updated,
        }
    } else {
        BulkResponse {
            inserted: state.store.bulk_insert(body.events).await.len(),
            updated: 0,
        }
    };
    tracing::info!(
        inserted = response.inserted,
        updated = response.updated,
        dedupe = params.dedupe,
        "api: bulk ingest applied"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response, req_id.0))))
}

/// PATCH /api/v1/events/{id}
pub(super) async fn update_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<ApiResponse<ConflictEvent>>, ApiError> {
    patch.validate().map_err(|e| map_core_error(&req_id.0, &e))?;
    let event = state
        .store
        .update(&id, patch)
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;
    Ok(Json(ApiResponse::new(event, req_id.0)))
}

/// DELETE /api/v1/events/{id}
pub(super) async fn delete_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(&id).await {
        tracing::info!(id = %id, "api: event deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("event '{id}' not found"),
        ))
    }
}
