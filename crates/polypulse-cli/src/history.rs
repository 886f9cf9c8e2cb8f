//! Read-only feeding-history reports straight from the database.

use chrono::Utc;
use polypulse_core::{FeedStore, FeedingEvent, FeedingStatistics, TimeWindow};
use polypulse_db::PgFeedStore;

/// Print aggregate feeding statistics for a look-back window.
///
/// # Errors
///
/// Returns an error if the event query fails.
pub(crate) async fn run_stats(store: &PgFeedStore, duration: &str) -> anyhow::Result<()> {
    let window = TimeWindow::parse_or_default(duration);
    let (start, end) = window.range_ending_at(Utc::now());
    let events = store.feeding_events_in_range(start, end, None).await?;
    let stats = FeedingStatistics::from_events(&events);

    println!("window:          {window} ({start} .. {end})");
    println!(
        "feeds:           {} ({} ok, {} failed)",
        stats.total_feeds, stats.successful_feeds, stats.failed_feeds
    );
    println!(
        "posts:           {} received, {} saved, {} skipped, {} errors",
        stats.total_posts_received,
        stats.total_posts_saved,
        stats.total_posts_skipped,
        stats.total_posts_errors
    );
    println!("avg processing:  {:.1} ms", stats.average_processing_time);
    println!("success rate:    {:.2}%", stats.success_rate);
    Ok(())
}

/// Print the newest feeding events in a look-back window.
///
/// # Errors
///
/// Returns an error if the event query fails.
pub(crate) async fn run_events(
    store: &PgFeedStore,
    duration: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let window = TimeWindow::parse_or_default(duration);
    let (start, end) = window.range_ending_at(Utc::now());
    let events = store.feeding_events_in_range(start, end, Some(limit)).await?;

    if events.is_empty() {
        println!("no feeding events in the last {window}");
        return Ok(());
    }

    println!(
        "{:<8}{:<22}{:>6}{:>6}{:>6}{:>6}{:>8}  STATUS",
        "FEED", "RECEIVED", "RECV", "SAVED", "SKIP", "ERR", "MS"
    );
    for event in &events {
        println!("{}", format_event_row(event));
    }
    Ok(())
}

fn format_event_row(event: &FeedingEvent) -> String {
    let status = if event.is_successful {
        "ok".to_string()
    } else {
        format!(
            "failed{}",
            event
                .error_message
                .as_deref()
                .map(|m| format!(": {m}"))
                .unwrap_or_default()
        )
    };
    format!(
        "{:<8}{:<22}{:>6}{:>6}{:>6}{:>6}{:>8}  {}",
        event.feed_count,
        event.timestamp.format("%Y-%m-%d %H:%M:%S"),
        event.posts_received,
        event.posts_saved,
        event.posts_skipped,
        event.posts_errors,
        event.processing_time_ms,
        status
    )
}
