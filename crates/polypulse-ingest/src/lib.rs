//! Feed ingestion and health monitoring.
//!
//! [`FeedService`] is the boundary the HTTP server and CLI call into. It
//! records each arrival with the [`HealthMonitor`], hands the batch to the
//! [`IngestProcessor`], and answers health and feeding-history queries.

pub mod health;
pub mod memory;
pub mod processor;
pub mod service;
pub mod summary;

use polypulse_core::StoreError;
use thiserror::Error;

pub use health::{Arrival, FeedingStatus, HealthCounters, HealthMonitor, HealthSnapshot};
pub use memory::InMemoryFeedStore;
pub use processor::{
    parse_batch, BatchItem, IngestOutcome, IngestProcessor, ItemFailure, ItemFailureKind,
};
pub use service::{FeedService, FeedSubmission, IngestSettings, TimeRange, Windowed};
pub use summary::FeedSummary;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid feed payload: {0}")]
    InvalidPayload(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("failed to record feeding event: {0}")]
    EventLog(StoreError),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid feed payload: {0}")]
    InvalidPayload(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            other @ StoreError::Query(_) => Self::Store(other),
        }
    }
}

impl From<IngestError> for ServiceError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::InvalidPayload(msg) => Self::InvalidPayload(msg),
            IngestError::StoreUnavailable(msg) => Self::StoreUnavailable(msg),
            IngestError::EventLog(e) => Self::Store(e),
        }
    }
}
