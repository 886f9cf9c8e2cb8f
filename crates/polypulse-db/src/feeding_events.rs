//! Database operations for the append-only `feeding_events` table.

use chrono::{DateTime, Utc};
use polypulse_core::{FeedingEvent, NewFeedingEvent};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `feeding_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedingEventRow {
    pub id: i64,
    pub received_at: DateTime<Utc>,
    pub feed_count: i64,
    pub posts_received: i32,
    pub posts_saved: i32,
    pub posts_skipped: i32,
    pub posts_errors: i32,
    pub processing_time_ms: i64,
    pub is_successful: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FeedingEventRow> for FeedingEvent {
    fn from(row: FeedingEventRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.received_at,
            feed_count: row.feed_count,
            posts_received: row.posts_received,
            posts_saved: row.posts_saved,
            posts_skipped: row.posts_skipped,
            posts_errors: row.posts_errors,
            processing_time_ms: row.processing_time_ms,
            is_successful: row.is_successful,
            error_message: row.error_message,
        }
    }
}

/// Appends one feeding event and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_feeding_event(
    pool: &PgPool,
    event: &NewFeedingEvent,
) -> Result<FeedingEventRow, DbError> {
    let row = sqlx::query_as::<_, FeedingEventRow>(
        "INSERT INTO feeding_events \
             (received_at, feed_count, posts_received, posts_saved, posts_skipped, \
              posts_errors, processing_time_ms, is_successful, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id, received_at, feed_count, posts_received, posts_saved, posts_skipped, \
                   posts_errors, processing_time_ms, is_successful, error_message, created_at",
    )
    .bind(event.timestamp)
    .bind(event.feed_count)
    .bind(event.posts_received)
    .bind(event.posts_saved)
    .bind(event.posts_skipped)
    .bind(event.posts_errors)
    .bind(event.processing_time_ms)
    .bind(event.is_successful)
    .bind(&event.error_message)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns events received in `[start, end]`, newest first.
///
/// `limit = None` returns every event in the range.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_feeding_events_in_range(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: Option<i64>,
) -> Result<Vec<FeedingEventRow>, DbError> {
    // LIMIT NULL is LIMIT ALL in Postgres.
    let rows = sqlx::query_as::<_, FeedingEventRow>(
        "SELECT id, received_at, feed_count, posts_received, posts_saved, posts_skipped, \
                posts_errors, processing_time_ms, is_successful, error_message, created_at \
         FROM feeding_events \
         WHERE received_at >= $1 AND received_at <= $2 \
         ORDER BY received_at DESC, id DESC \
         LIMIT $3",
    )
    .bind(start)
    .bind(end)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
