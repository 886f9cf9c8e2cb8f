//! The durable store the ingestion core persists through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::feeding::{FeedingEvent, NewFeedingEvent};
use crate::posts::{Account, PostRecord, PostWithAccount};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store cannot be reached at all. Fatal for the whole batch.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A single read or write failed.
    #[error("store query failed: {0}")]
    Query(String),
}

/// Persistence for accounts, posts, and the feeding-event log.
///
/// Implementations must enforce post-id uniqueness themselves: two concurrent
/// [`insert_post_if_absent`](FeedStore::insert_post_if_absent) calls for the
/// same id resolve to exactly one `true`.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn find_post(&self, id: &str) -> Result<Option<PostWithAccount>, StoreError>;

    /// Create the account, or overwrite every field if it already exists.
    async fn upsert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Returns `false` when a post with the same id already exists.
    async fn insert_post_if_absent(&self, post: &PostRecord) -> Result<bool, StoreError>;

    async fn insert_feeding_event(
        &self,
        event: &NewFeedingEvent,
    ) -> Result<FeedingEvent, StoreError>;

    /// Events with `start <= timestamp <= end`, newest first.
    async fn feeding_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<FeedingEvent>, StoreError>;
}
