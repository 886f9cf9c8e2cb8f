//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the feed
//! health watchdog.

use std::sync::Arc;

use polypulse_ingest::{FeedService, FeedingStatus, HealthSnapshot};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every minute, on the minute.
const HEALTH_WATCHDOG_SCHEDULE: &str = "0 * * * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(feed: Arc<FeedService>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_health_watchdog(&scheduler, feed).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Logs the feed health snapshot once a minute.
async fn register_health_watchdog(
    scheduler: &JobScheduler,
    feed: Arc<FeedService>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(HEALTH_WATCHDOG_SCHEDULE, move |_uuid, _lock| {
        let feed = Arc::clone(&feed);

        Box::pin(async move {
            report_health(&feed.health_snapshot());
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

fn needs_attention(status: FeedingStatus) -> bool {
    matches!(status, FeedingStatus::Fair | FeedingStatus::Poor)
}

fn report_health(snapshot: &HealthSnapshot) {
    if needs_attention(snapshot.feeding_status) {
        tracing::warn!(
            status = %snapshot.feeding_status,
            health_pct = snapshot.feeding_health_percentage,
            expected = snapshot.expected_feed_counter,
            actual = snapshot.actual_feed_counter,
            missing = snapshot.missing_feeds,
            current_gap_ms = snapshot.current_unfeed_interval_ms,
            "scheduler: feed cadence degraded"
        );
    } else {
        tracing::debug!(
            status = %snapshot.feeding_status,
            health_pct = snapshot.feeding_health_percentage,
            actual = snapshot.actual_feed_counter,
            "scheduler: feed cadence healthy"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fair_and_poor_need_attention() {
        assert!(!needs_attention(FeedingStatus::Excellent));
        assert!(!needs_attention(FeedingStatus::Good));
        assert!(needs_attention(FeedingStatus::Fair));
        assert!(needs_attention(FeedingStatus::Poor));
    }

    #[tokio::test]
    async fn watchdog_schedule_is_a_valid_cron_expression() {
        assert!(Job::new(HEALTH_WATCHDOG_SCHEDULE, |_uuid, _lock| {}).is_ok());
    }
}
