mod history;
mod push;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "polypulse-cli")]
#[command(about = "PolyPulse feed ingestion command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Push a feed batch file to a running server
    Push {
        /// JSON file holding an array of posts (or `{ "feed": [...] }`)
        file: PathBuf,
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Show the live feed health reported by a running server
    Health {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Aggregate feeding statistics over a look-back window
    Stats {
        /// Window token: 15s, 1m, 5m, 10m, 1h, 1d, 1w
        #[arg(long, default_value = "1h")]
        duration: String,
    },
    /// List recent feeding events
    Events {
        /// Window token: 15s, 1m, 5m, 10m, 1h, 1d, 1w
        #[arg(long, default_value = "1h")]
        duration: String,
        /// Maximum number of events to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, clap::Args)]
struct ServerArgs {
    /// Base URL of the server
    #[arg(long, env = "POLYPULSE_SERVER_URL", default_value = "http://localhost:3001")]
    server: String,
    /// Bearer token for the server's protected routes
    #[arg(long, env = "POLYPULSE_API_TOKEN")]
    token: Option<String>,
    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

impl ServerArgs {
    fn client(self) -> anyhow::Result<push::PushClient> {
        Ok(push::PushClient::new(
            &self.server,
            self.token,
            self.timeout_secs,
        )?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Push { file, server }) => push::run_push(&server.client()?, &file).await?,
        Some(Commands::Health { server }) => push::run_health(&server.client()?).await?,
        Some(Commands::Db { command }) => {
            let pool = connect().await?;
            match command {
                DbCommands::Ping => {
                    polypulse_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = polypulse_db::run_migrations(&pool).await?;
                    println!("migrations applied: {applied}");
                }
            }
        }
        Some(Commands::Stats { duration }) => {
            let store = polypulse_db::PgFeedStore::new(connect().await?);
            history::run_stats(&store, &duration).await?;
        }
        Some(Commands::Events { duration, limit }) => {
            let store = polypulse_db::PgFeedStore::new(connect().await?);
            history::run_events(&store, &duration, limit).await?;
        }
        None => println!("polypulse-cli ready; run with --help for commands"),
    }

    Ok(())
}

async fn connect() -> anyhow::Result<sqlx::PgPool> {
    let config = polypulse_core::load_app_config()?;
    let pool_config = polypulse_db::PoolConfig::from_app_config(&config);
    Ok(polypulse_db::connect_pool(&config.database_url, pool_config).await?)
}

#[cfg(test)]
mod tests;
