//! The append-only feeding-event log and its aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-batch post counters. Invariant for a processed batch:
/// `saved + skipped + errors == received`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub received: usize,
    pub saved: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// A feeding event about to be written. Written exactly once per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedingEvent {
    /// When the batch was received.
    pub timestamp: DateTime<Utc>,
    /// Sequence number assigned by the health monitor.
    pub feed_count: i64,
    pub posts_received: i32,
    pub posts_saved: i32,
    pub posts_skipped: i32,
    pub posts_errors: i32,
    pub processing_time_ms: i64,
    pub is_successful: bool,
    pub error_message: Option<String>,
}

impl NewFeedingEvent {
    /// Event for a batch that ran through the processor.
    /// Successful iff no post errored.
    #[must_use]
    pub fn from_batch(
        timestamp: DateTime<Utc>,
        feed_count: i64,
        counts: BatchCounts,
        processing_time_ms: i64,
    ) -> Self {
        Self {
            timestamp,
            feed_count,
            posts_received: saturating_i32(counts.received),
            posts_saved: saturating_i32(counts.saved),
            posts_skipped: saturating_i32(counts.skipped),
            posts_errors: saturating_i32(counts.errors),
            processing_time_ms,
            is_successful: counts.errors == 0,
            error_message: None,
        }
    }

    /// Zero-count failed event for a batch that never reached the processor.
    #[must_use]
    pub fn rejected(
        timestamp: DateTime<Utc>,
        feed_count: i64,
        processing_time_ms: i64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            feed_count,
            posts_received: 0,
            posts_saved: 0,
            posts_skipped: 0,
            posts_errors: 0,
            processing_time_ms,
            is_successful: false,
            error_message: Some(error_message.into()),
        }
    }
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// A persisted feeding event. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedingEvent {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub feed_count: i64,
    pub posts_received: i32,
    pub posts_saved: i32,
    pub posts_skipped: i32,
    pub posts_errors: i32,
    pub processing_time_ms: i64,
    pub is_successful: bool,
    pub error_message: Option<String>,
}

impl FeedingEvent {
    #[must_use]
    pub fn from_new(id: i64, event: NewFeedingEvent) -> Self {
        Self {
            id,
            timestamp: event.timestamp,
            feed_count: event.feed_count,
            posts_received: event.posts_received,
            posts_saved: event.posts_saved,
            posts_skipped: event.posts_skipped,
            posts_errors: event.posts_errors,
            processing_time_ms: event.processing_time_ms,
            is_successful: event.is_successful,
            error_message: event.error_message,
        }
    }
}

/// Aggregate over the feeding events of a time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedingStatistics {
    pub total_feeds: u64,
    pub successful_feeds: u64,
    pub failed_feeds: u64,
    pub total_posts_received: i64,
    pub total_posts_saved: i64,
    pub total_posts_skipped: i64,
    pub total_posts_errors: i64,
    /// Mean `processing_time_ms`; `0.0` when there are no events.
    pub average_processing_time: f64,
    /// Percentage of successful feeds; `0.0` when there are no events.
    pub success_rate: f64,
}

impl FeedingStatistics {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_events(events: &[FeedingEvent]) -> Self {
        if events.is_empty() {
            return Self::default();
        }

        let total_feeds = events.len() as u64;
        let successful_feeds = events.iter().filter(|e| e.is_successful).count() as u64;
        let sum = |f: fn(&FeedingEvent) -> i32| -> i64 {
            events.iter().map(|e| i64::from(f(e))).sum()
        };
        let total_processing: i64 = events.iter().map(|e| e.processing_time_ms).sum();

        Self {
            total_feeds,
            successful_feeds,
            failed_feeds: total_feeds - successful_feeds,
            total_posts_received: sum(|e| e.posts_received),
            total_posts_saved: sum(|e| e.posts_saved),
            total_posts_skipped: sum(|e| e.posts_skipped),
            total_posts_errors: sum(|e| e.posts_errors),
            average_processing_time: total_processing as f64 / total_feeds as f64,
            success_rate: successful_feeds as f64 / total_feeds as f64 * 100.0,
        }
    }
}

#[cfg(test)]
#[path = "feeding_test.rs"]
mod tests;
