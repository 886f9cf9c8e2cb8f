use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where the health monitor anchors its uptime epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthEpoch {
    /// Uptime counts from monitor construction (process boot).
    #[default]
    Boot,
    /// Uptime counts from the first feed observed; counters are reset on it.
    FirstFeed,
}

impl std::fmt::Display for HealthEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthEpoch::Boot => write!(f, "boot"),
            HealthEpoch::FirstFeed => write!(f, "first_feed"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Posts authored by this username are flagged `is_subject_post`.
    pub subject_username: String,
    /// Cadence the upstream pusher is expected to feed at.
    pub feed_interval_ms: u64,
    pub health_epoch: HealthEpoch,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("subject_username", &self.subject_username)
            .field("feed_interval_ms", &self.feed_interval_ms)
            .field("health_epoch", &self.health_epoch)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
