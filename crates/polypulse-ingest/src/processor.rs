//! Turns one pushed batch into persisted accounts, posts, and a single
//! feeding event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use polypulse_core::{
    BatchCounts, Clock, FeedStore, FeedingEvent, NewFeedingEvent, PostPayload, PostRecord,
    PostWithAccount, StoreError,
};
use serde_json::Value;

use crate::IngestError;

const EXCERPT_CHARS: usize = 100;

/// One element of a pushed batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItem {
    Post(Box<PostPayload>),
    /// The element could not be read as a post. Counted as an error.
    Malformed {
        post_id: Option<String>,
        reason: String,
    },
}

/// Why a single post was not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFailureKind {
    Malformed(String),
    Lookup(String),
    AccountWrite(String),
    PostWrite(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// `None` when a malformed element carried no readable id.
    pub post_id: Option<String>,
    pub kind: ItemFailureKind,
}

/// Result of one processed batch.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub counts: BatchCounts,
    /// Posts newly stored by this batch, in batch order.
    pub saved_records: Vec<PostWithAccount>,
    pub failures: Vec<ItemFailure>,
    /// The feeding event written for this batch.
    pub event: FeedingEvent,
}

/// Split a raw feed into batch items.
///
/// # Errors
///
/// Returns [`IngestError::InvalidPayload`] if `feed` is not a JSON array.
pub fn parse_batch(feed: &Value) -> Result<Vec<BatchItem>, IngestError> {
    let Some(elements) = feed.as_array() else {
        return Err(IngestError::InvalidPayload(
            "feed must be an array of posts".to_string(),
        ));
    };

    Ok(elements
        .iter()
        .map(|element| match serde_json::from_value::<PostPayload>(element.clone()) {
            Ok(post) => BatchItem::Post(Box::new(post)),
            Err(e) => BatchItem::Malformed {
                post_id: element
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                reason: e.to_string(),
            },
        })
        .collect())
}

/// Processes batches against a [`FeedStore`].
#[derive(Clone)]
pub struct IngestProcessor {
    store: Arc<dyn FeedStore>,
    clock: Arc<dyn Clock>,
    subject_username: String,
}

impl std::fmt::Debug for IngestProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestProcessor")
            .field("subject_username", &self.subject_username)
            .finish_non_exhaustive()
    }
}

enum ItemResult {
    Saved(PostWithAccount),
    Skipped,
    Failed(ItemFailureKind),
}

impl IngestProcessor {
    #[must_use]
    pub fn new(
        store: Arc<dyn FeedStore>,
        clock: Arc<dyn Clock>,
        subject_username: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            subject_username: subject_username.into(),
        }
    }

    /// Persist every new post in `items` and write exactly one feeding event
    /// carrying `sequence` as its `feed_count`.
    ///
    /// A post whose id is already stored (including one saved earlier in the
    /// same batch) is skipped. A per-item store failure is counted as an
    /// error and processing continues with the next item.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::StoreUnavailable`] as soon as the store reports
    /// it cannot be reached; no event is written for the batch in that case.
    /// Returns [`IngestError::EventLog`] if the final event write fails.
    pub async fn ingest(
        &self,
        items: &[BatchItem],
        sequence: u64,
        received_at: DateTime<Utc>,
    ) -> Result<IngestOutcome, IngestError> {
        let mut counts = BatchCounts {
            received: items.len(),
            ..BatchCounts::default()
        };
        let mut saved_records = Vec::new();
        let mut failures = Vec::new();

        for item in items {
            let (post_id, result) = match item {
                BatchItem::Malformed { post_id, reason } => (
                    post_id.clone(),
                    ItemResult::Failed(ItemFailureKind::Malformed(reason.clone())),
                ),
                BatchItem::Post(post) => (Some(post.id.clone()), self.ingest_one(post).await?),
            };

            match result {
                ItemResult::Saved(record) => {
                    counts.saved += 1;
                    saved_records.push(record);
                }
                ItemResult::Skipped => counts.skipped += 1,
                ItemResult::Failed(kind) => {
                    tracing::warn!(post_id = ?post_id, error = ?kind, "failed to ingest post");
                    counts.errors += 1;
                    failures.push(ItemFailure { post_id, kind });
                }
            }
        }

        let processing_time_ms = (self.clock.now() - received_at).num_milliseconds().max(0);
        let feed_count = i64::try_from(sequence).unwrap_or(i64::MAX);
        let event = self
            .store
            .insert_feeding_event(&NewFeedingEvent::from_batch(
                received_at,
                feed_count,
                counts,
                processing_time_ms,
            ))
            .await
            .map_err(|e| match e {
                StoreError::Unavailable(msg) => IngestError::StoreUnavailable(msg),
                other @ StoreError::Query(_) => IngestError::EventLog(other),
            })?;

        tracing::info!(
            sequence,
            received = counts.received,
            saved = counts.saved,
            skipped = counts.skipped,
            errors = counts.errors,
            processing_time_ms,
            "feed batch processed"
        );

        Ok(IngestOutcome {
            counts,
            saved_records,
            failures,
            event,
        })
    }

    async fn ingest_one(&self, post: &PostPayload) -> Result<ItemResult, IngestError> {
        match self.store.find_post(&post.id).await {
            Ok(Some(_)) => {
                tracing::debug!(post_id = %post.id, "post already stored, skipping");
                return Ok(ItemResult::Skipped);
            }
            Ok(None) => {}
            Err(e) => return failed(e, ItemFailureKind::Lookup),
        }

        if let Err(e) = self.store.upsert_account(&post.account).await {
            return failed(e, ItemFailureKind::AccountWrite);
        }

        let record = PostRecord::from_payload(post, &self.subject_username, self.clock.now());
        match self.store.insert_post_if_absent(&record).await {
            Ok(true) => {
                tracing::info!(
                    post_id = %record.id,
                    username = %post.account.username,
                    subject = record.is_subject_post,
                    excerpt = %excerpt(&record.content),
                    "stored new post"
                );
                Ok(ItemResult::Saved(PostWithAccount {
                    post: record,
                    account: post.account.clone(),
                }))
            }
            // Lost a race with a concurrent batch carrying the same id.
            Ok(false) => Ok(ItemResult::Skipped),
            Err(e) => failed(e, ItemFailureKind::PostWrite),
        }
    }
}

fn failed(
    error: StoreError,
    kind: fn(String) -> ItemFailureKind,
) -> Result<ItemResult, IngestError> {
    match error {
        StoreError::Unavailable(msg) => Err(IngestError::StoreUnavailable(msg)),
        StoreError::Query(msg) => Ok(ItemResult::Failed(kind(msg))),
    }
}

fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}
