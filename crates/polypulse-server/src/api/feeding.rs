use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use polypulse_core::{FeedingEvent, FeedingStatistics};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_service_error, ApiError, ApiResponse, AppState, ResponseMeta};

const DEFAULT_EVENT_LIMIT: usize = 1000;
const MAX_EVENT_LIMIT: usize = 10_000;

#[derive(Debug, Deserialize)]
pub(super) struct FeedingQuery {
    /// Duration token; unknown or missing means `1h`.
    pub duration: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct FeedingEventsData {
    duration: &'static str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    count: usize,
    events: Vec<FeedingEvent>,
}

#[derive(Debug, Serialize)]
pub(super) struct FeedingStatisticsData {
    duration: &'static str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    statistics: FeedingStatistics,
}

pub(super) async fn list_feeding_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FeedingQuery>,
) -> Result<Json<ApiResponse<FeedingEventsData>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    let windowed = state
        .feed
        .recent_events(query.duration.as_deref().unwrap_or_default(), limit)
        .await
        .map_err(|e| map_service_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: FeedingEventsData {
            duration: windowed.range.duration,
            start: windowed.range.start,
            end: windowed.range.end,
            count: windowed.data.len(),
            events: windowed.data,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn feeding_statistics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FeedingQuery>,
) -> Result<Json<ApiResponse<FeedingStatisticsData>>, ApiError> {
    let windowed = state
        .feed
        .historical_statistics(query.duration.as_deref().unwrap_or_default())
        .await
        .map_err(|e| map_service_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: FeedingStatisticsData {
            duration: windowed.range.duration,
            start: windowed.range.start,
            end: windowed.range.end,
            statistics: windowed.data,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
