//! Process-lifetime feed cadence counters and the health metrics derived
//! from them.
//!
//! Counters live in memory only and reset when the process restarts. Every
//! batch arrival goes through [`HealthMonitor::record_arrival`], which updates
//! all counters under one lock so concurrent arrivals never lose an update.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use polypulse_core::{Clock, HealthEpoch};
use serde::Serialize;

/// Four-level classification of `feeding_health_percentage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedingStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl FeedingStatus {
    /// Thresholds are inclusive lower bounds, checked top-down.
    #[must_use]
    pub fn classify(percentage: f64) -> Self {
        if percentage >= 95.0 {
            Self::Excellent
        } else if percentage >= 80.0 {
            Self::Good
        } else if percentage >= 60.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

impl std::fmt::Display for FeedingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw cadence counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCounters {
    pub service_started_at: DateTime<Utc>,
    /// Batches received since `service_started_at`.
    pub feed_counter: u64,
    pub last_feed_at: DateTime<Utc>,
    /// Longest gap observed between two consecutive arrivals.
    pub longest_unfeed_interval_ms: i64,
    first_feed_seen: bool,
}

impl HealthCounters {
    fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            service_started_at: at,
            feed_counter: 0,
            last_feed_at: at,
            longest_unfeed_interval_ms: 0,
            first_feed_seen: false,
        }
    }

    /// Derive the health snapshot as seen at `now`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self, now: DateTime<Utc>, feed_interval_ms: u64) -> HealthSnapshot {
        let uptime_ms = (now - self.service_started_at).num_milliseconds().max(0);
        let uptime = u64::try_from(uptime_ms).unwrap_or(0);
        let expected_feed_counter = uptime.div_ceil(feed_interval_ms.max(1)).max(1);
        let missing_feeds = expected_feed_counter.saturating_sub(self.feed_counter);

        let percentage = if expected_feed_counter == 0 {
            100.0
        } else {
            self.feed_counter as f64 / expected_feed_counter as f64 * 100.0
        };

        HealthSnapshot {
            service_started_at: self.service_started_at,
            last_feed_at: self.last_feed_at,
            uptime_ms,
            feed_interval_ms,
            expected_feed_counter,
            actual_feed_counter: self.feed_counter,
            missing_feeds,
            feeding_health_percentage: (percentage * 100.0).round() / 100.0,
            feeding_status: FeedingStatus::classify(percentage),
            longest_unfeed_interval_ms: self.longest_unfeed_interval_ms,
            current_unfeed_interval_ms: (now - self.last_feed_at).num_milliseconds(),
        }
    }
}

/// Point-in-time health metrics. Computed without touching the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub service_started_at: DateTime<Utc>,
    pub last_feed_at: DateTime<Utc>,
    pub uptime_ms: i64,
    pub feed_interval_ms: u64,
    pub expected_feed_counter: u64,
    pub actual_feed_counter: u64,
    pub missing_feeds: u64,
    /// Rounded to two decimals. `feeding_status` is classified before rounding.
    pub feeding_health_percentage: f64,
    pub feeding_status: FeedingStatus,
    pub longest_unfeed_interval_ms: i64,
    /// Live gap since the last arrival. Reported independently of
    /// `longest_unfeed_interval_ms` and may exceed it.
    pub current_unfeed_interval_ms: i64,
}

/// One recorded arrival: its 1-based sequence number and the time it was
/// counted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
}

/// Owns the cadence counters for one process.
pub struct HealthMonitor {
    clock: Arc<dyn Clock>,
    feed_interval_ms: u64,
    epoch: HealthEpoch,
    counters: Mutex<HealthCounters>,
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("feed_interval_ms", &self.feed_interval_ms)
            .field("epoch", &self.epoch)
            .field("counters", &self.counters())
            .finish_non_exhaustive()
    }
}

impl HealthMonitor {
    /// Creates a monitor whose epoch is the clock's current time.
    ///
    /// With [`HealthEpoch::FirstFeed`] the epoch moves to the first arrival.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, feed_interval_ms: u64, epoch: HealthEpoch) -> Self {
        let counters = HealthCounters::starting_at(clock.now());
        Self {
            clock,
            feed_interval_ms,
            epoch,
            counters: Mutex::new(counters),
        }
    }

    /// Record a batch arrival now. The clock is read under the counter lock,
    /// so sequence numbers and arrival times advance together.
    pub fn record_arrival(&self) -> Arrival {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        self.apply_arrival(&mut counters, now)
    }

    /// Record a batch arrival at `now`.
    ///
    /// An arrival older than the last one is recorded at the last arrival's
    /// time; `last_feed_at` never moves backwards.
    pub fn record_arrival_at(&self, now: DateTime<Utc>) -> Arrival {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        self.apply_arrival(&mut counters, now)
    }

    fn apply_arrival(&self, counters: &mut HealthCounters, now: DateTime<Utc>) -> Arrival {
        if !counters.first_feed_seen {
            if self.epoch == HealthEpoch::FirstFeed {
                *counters = HealthCounters::starting_at(now);
            }
            counters.first_feed_seen = true;
        }

        let received_at = now.max(counters.last_feed_at);
        let gap = (received_at - counters.last_feed_at).num_milliseconds();
        if gap > counters.longest_unfeed_interval_ms {
            counters.longest_unfeed_interval_ms = gap;
        }
        counters.last_feed_at = received_at;
        counters.feed_counter += 1;

        tracing::debug!(
            sequence = counters.feed_counter,
            gap_ms = gap,
            "feed arrival recorded"
        );

        Arrival {
            sequence: counters.feed_counter,
            received_at,
        }
    }

    /// Copy of the current counters.
    #[must_use]
    pub fn counters(&self) -> HealthCounters {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        self.snapshot_at(self.clock.now())
    }

    #[must_use]
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> HealthSnapshot {
        self.counters().snapshot(now, self.feed_interval_ms)
    }
}
