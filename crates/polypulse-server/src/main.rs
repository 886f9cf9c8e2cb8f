mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use polypulse_core::SystemClock;
use polypulse_ingest::{FeedService, IngestSettings};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = polypulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = polypulse_db::PoolConfig::from_app_config(&config);
    let pool = polypulse_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = polypulse_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let store = Arc::new(polypulse_db::PgFeedStore::new(pool.clone()));
    let feed = Arc::new(FeedService::new(
        store,
        Arc::new(SystemClock),
        IngestSettings::from_app_config(&config),
    ));

    let _scheduler = scheduler::build_scheduler(Arc::clone(&feed)).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        polypulse_core::Environment::Development
    ))?;
    let app = build_app(AppState { pool, feed }, auth);

    tracing::info!(
        bind_addr = %config.bind_addr,
        env = %config.env,
        subject = %config.subject_username,
        feed_interval_ms = config.feed_interval_ms,
        health_epoch = %config.health_epoch,
        "polypulse server listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
