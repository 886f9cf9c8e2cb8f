//! Domain types shared by every `PolyPulse` crate.
//!
//! Holds the social-feed records (posts, accounts), the feeding-event log
//! types and their aggregation, the [`FeedStore`] seam the ingestion core
//! persists through, the injectable [`Clock`], and configuration loading.

pub mod app_config;
pub mod clock;
pub mod config;
pub mod feeding;
pub mod posts;
pub mod store;
pub mod window;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, HealthEpoch};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_app_config, load_app_config_from_env};
pub use feeding::{BatchCounts, FeedingEvent, FeedingStatistics, NewFeedingEvent};
pub use posts::{Account, PostPayload, PostRecord, PostWithAccount};
pub use store::{FeedStore, StoreError};
pub use window::TimeWindow;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
