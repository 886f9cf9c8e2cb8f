//! [`FeedStore`] backed by the Postgres pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use polypulse_core::{
    Account, FeedStore, FeedingEvent, NewFeedingEvent, PostRecord, PostWithAccount, StoreError,
};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone)]
pub struct PgFeedStore {
    pool: PgPool,
}

impl PgFeedStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<DbError> for StoreError {
    fn from(error: DbError) -> Self {
        if error.is_connection_error() {
            StoreError::Unavailable(error.to_string())
        } else {
            StoreError::Query(error.to_string())
        }
    }
}

#[async_trait]
impl FeedStore for PgFeedStore {
    async fn find_post(&self, id: &str) -> Result<Option<PostWithAccount>, StoreError> {
        let row = crate::get_post_with_account(&self.pool, id).await?;
        Ok(row.map(PostWithAccount::from))
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        crate::upsert_account(&self.pool, account).await?;
        Ok(())
    }

    async fn insert_post_if_absent(&self, post: &PostRecord) -> Result<bool, StoreError> {
        Ok(crate::insert_post_if_absent(&self.pool, post).await?)
    }

    async fn insert_feeding_event(
        &self,
        event: &NewFeedingEvent,
    ) -> Result<FeedingEvent, StoreError> {
        let row = crate::insert_feeding_event(&self.pool, event).await?;
        Ok(row.into())
    }

    async fn feeding_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<FeedingEvent>, StoreError> {
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows = crate::list_feeding_events_in_range(&self.pool, start, end, limit).await?;
        Ok(rows.into_iter().map(FeedingEvent::from).collect())
    }
}
