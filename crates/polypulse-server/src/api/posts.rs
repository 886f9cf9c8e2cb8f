use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use polypulse_core::PostWithAccount;
use polypulse_ingest::HealthSnapshot;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct PostsQuery {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct PostStatisticsItem {
    total_posts: i64,
    subject_posts: i64,
    total_accounts: i64,
    latest_post_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct StatisticsData {
    posts: PostStatisticsItem,
    feeding: HealthSnapshot,
}

pub(super) async fn list_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<ApiResponse<Vec<PostWithAccount>>>, ApiError> {
    let rows = polypulse_db::list_posts(
        &state.pool,
        normalize_limit(query.limit),
        query.skip.unwrap_or(0).max(0),
        query.username.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(PostWithAccount::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_subject_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<ApiResponse<Vec<PostWithAccount>>>, ApiError> {
    let rows = polypulse_db::list_subject_posts(
        &state.pool,
        normalize_limit(query.limit),
        query.skip.unwrap_or(0).max(0),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(PostWithAccount::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PostWithAccount>>, ApiError> {
    let row = polypulse_db::get_post_with_account(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(req_id.0.clone(), "not_found", format!("post {id} not found"))
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Stored-post totals next to the live feed health.
pub(super) async fn statistics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatisticsData>>, ApiError> {
    let stats = polypulse_db::post_statistics(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: StatisticsData {
            posts: PostStatisticsItem {
                total_posts: stats.total_posts,
                subject_posts: stats.subject_posts,
                total_accounts: stats.total_accounts,
                latest_post_at: stats.latest_post_at,
            },
            feeding: state.feed.health_snapshot(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
