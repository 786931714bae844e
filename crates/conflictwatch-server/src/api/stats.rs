use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use conflictwatch_core::{
    aggregate::DEFAULT_HOTSPOT_LIMIT, compute_stats, rank_hotspots, Hotspot, StatsSnapshot,
};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::events::EventsQuery;
use super::{ApiError, ApiResponse, AppState};

const MAX_HOTSPOT_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub(super) struct HotspotsQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/stats
///
/// Computed over every event matching the filter; `limit` is ignored so the
/// totals are never truncated.
pub(super) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<ApiResponse<StatsSnapshot>>, ApiError> {
    let filter = params.to_filter(&req_id.0, usize::MAX)?;
    let events = state.store.query(&filter).await;
    let stats = compute_stats(&events, Utc::now());
    Ok(Json(ApiResponse::new(stats, req_id.0)))
}

/// GET /api/v1/hotspots
///
/// Always ranks the whole store, never a filtered view.
pub(super) async fn list_hotspots(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<HotspotsQuery>,
) -> Json<ApiResponse<Vec<Hotspot>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HOTSPOT_LIMIT)
        .clamp(1, MAX_HOTSPOT_LIMIT);
    let events = state.store.snapshot().await;
    Json(ApiResponse::new(rank_hotspots(&events, limit), req_id.0))
}
