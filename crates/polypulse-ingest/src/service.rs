//! The boundary operations exposed to the HTTP server and the CLI.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use polypulse_core::{
    AppConfig, BatchCounts, Clock, FeedStore, FeedingEvent, FeedingStatistics, HealthEpoch,
    NewFeedingEvent, PostWithAccount, TimeWindow,
};
use serde::Serialize;
use serde_json::Value;

use crate::health::{Arrival, HealthMonitor, HealthSnapshot};
use crate::processor::{parse_batch, IngestProcessor, ItemFailure};
use crate::summary::FeedSummary;
use crate::{IngestError, ServiceError};

/// Settings the service needs from [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    pub subject_username: String,
    pub feed_interval_ms: u64,
    pub health_epoch: HealthEpoch,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            subject_username: "realDonaldTrump".to_string(),
            feed_interval_ms: 15_000,
            health_epoch: HealthEpoch::Boot,
        }
    }
}

impl IngestSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            subject_username: config.subject_username.clone(),
            feed_interval_ms: config.feed_interval_ms,
            health_epoch: config.health_epoch,
        }
    }
}

/// Result of one accepted batch.
#[derive(Debug, Clone)]
pub struct FeedSubmission {
    pub sequence: u64,
    pub counts: BatchCounts,
    pub summary: FeedSummary,
    pub processing_time_ms: i64,
    pub saved_records: Vec<PostWithAccount>,
    pub failures: Vec<ItemFailure>,
}

/// The resolved look-back window of a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    /// The duration token actually applied.
    pub duration: &'static str,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    fn resolve(token: &str, now: DateTime<Utc>) -> Self {
        let window = TimeWindow::parse_or_default(token);
        let (start, end) = window.range_ending_at(now);
        Self {
            duration: window.token(),
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Windowed<T> {
    pub range: TimeRange,
    pub data: T,
}

pub struct FeedService {
    store: Arc<dyn FeedStore>,
    clock: Arc<dyn Clock>,
    health: HealthMonitor,
    processor: IngestProcessor,
}

impl std::fmt::Debug for FeedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedService")
            .field("health", &self.health)
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

impl FeedService {
    #[must_use]
    pub fn new(store: Arc<dyn FeedStore>, clock: Arc<dyn Clock>, settings: IngestSettings) -> Self {
        let health = HealthMonitor::new(
            Arc::clone(&clock),
            settings.feed_interval_ms,
            settings.health_epoch,
        );
        let processor = IngestProcessor::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            settings.subject_username,
        );
        Self {
            store,
            clock,
            health,
            processor,
        }
    }

    #[must_use]
    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// Accept one pushed batch.
    ///
    /// The arrival is recorded with the health monitor before the payload is
    /// validated, so a rejected batch still counts as a feed.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidPayload`] if `feed` is not a JSON array.
    /// - [`ServiceError::StoreUnavailable`] if the store cannot be reached.
    /// - [`ServiceError::Store`] if the batch's feeding event cannot be written.
    ///
    /// In the first two cases a failed feeding event is logged on a
    /// best-effort basis before returning.
    pub async fn submit_feed(&self, feed: &Value) -> Result<FeedSubmission, ServiceError> {
        let Arrival {
            sequence,
            received_at,
        } = self.health.record_arrival();

        let items = match parse_batch(feed) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(sequence, error = %e, "rejected feed payload");
                self.log_failed_batch(sequence, received_at, &e.to_string())
                    .await;
                return Err(e.into());
            }
        };
        let summary = FeedSummary::from_items(&items);

        match self.processor.ingest(&items, sequence, received_at).await {
            Ok(outcome) => Ok(FeedSubmission {
                sequence,
                counts: outcome.counts,
                summary,
                processing_time_ms: outcome.event.processing_time_ms,
                saved_records: outcome.saved_records,
                failures: outcome.failures,
            }),
            Err(IngestError::StoreUnavailable(msg)) => {
                tracing::error!(sequence, error = %msg, "store unavailable, batch aborted");
                self.log_failed_batch(sequence, received_at, &msg).await;
                Err(ServiceError::StoreUnavailable(msg))
            }
            Err(e) => {
                tracing::error!(sequence, error = %e, "feed batch failed");
                Err(e.into())
            }
        }
    }

    /// Current health metrics. Never touches the store.
    #[must_use]
    pub fn health_snapshot(&self) -> HealthSnapshot {
        self.health.snapshot()
    }

    /// Aggregate the feeding events of the window named by `token`
    /// (unknown tokens mean `1h`).
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the events cannot be read.
    pub async fn historical_statistics(
        &self,
        token: &str,
    ) -> Result<Windowed<FeedingStatistics>, ServiceError> {
        let range = TimeRange::resolve(token, self.clock.now());
        let events = self
            .store
            .feeding_events_in_range(range.start, range.end, None)
            .await?;

        Ok(Windowed {
            range,
            data: FeedingStatistics::from_events(&events),
        })
    }

    /// The newest `limit` feeding events in the window named by `token`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the events cannot be read.
    pub async fn recent_events(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Windowed<Vec<FeedingEvent>>, ServiceError> {
        let range = TimeRange::resolve(token, self.clock.now());
        let events = self
            .store
            .feeding_events_in_range(range.start, range.end, Some(limit))
            .await?;

        Ok(Windowed {
            range,
            data: events,
        })
    }

    async fn log_failed_batch(&self, sequence: u64, received_at: DateTime<Utc>, message: &str) {
        let processing_time_ms = (self.clock.now() - received_at).num_milliseconds().max(0);
        let event = NewFeedingEvent::rejected(
            received_at,
            i64::try_from(sequence).unwrap_or(i64::MAX),
            processing_time_ms,
            message,
        );
        if let Err(e) = self.store.insert_feeding_event(&event).await {
            tracing::warn!(sequence, error = %e, "could not record failed feeding event");
        }
    }
}
