use axum::{body::Bytes, extract::State, Extension, Json};
use polypulse_ingest::FeedSummary;
use serde::Serialize;
use serde_json::Value;

use crate::middleware::RequestId;

use super::{map_service_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct FeedResult {
    sequence: u64,
    posts_received: usize,
    posts_saved: usize,
    posts_skipped: usize,
    posts_errors: usize,
    processing_time_ms: i64,
    summary: FeedSummary,
}

/// `POST /api/v1/feed` with body `{ "feed": [ ...posts ] }`.
///
/// The body is parsed by hand: an unparseable push still counts as an
/// arrival and gets the `validation_error` envelope.
pub(super) async fn submit_feed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ApiResponse<FeedResult>>, ApiError> {
    let body: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(request_id = %req_id.0, error = %e, "feed body is not valid JSON");
        Value::Null
    });
    let missing = Value::Null;
    let feed = body.get("feed").unwrap_or(&missing);

    let submission = state
        .feed
        .submit_feed(feed)
        .await
        .map_err(|e| map_service_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: FeedResult {
            sequence: submission.sequence,
            posts_received: submission.counts.received,
            posts_saved: submission.counts.saved,
            posts_skipped: submission.counts.skipped,
            posts_errors: submission.counts.errors,
            processing_time_ms: submission.processing_time_ms,
            summary: submission.summary,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
