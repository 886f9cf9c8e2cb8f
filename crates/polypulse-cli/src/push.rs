//! HTTP client for pushing feed batches to a running server.
//!
//! Used to replay captured batches or to drive the server by hand during
//! development. Responses are read through the server's JSON envelope.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("server rejected request ({status}): {code}: {message}")]
    Rejected {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("failed to read batch file: {0}")]
    Io(#[from] std::io::Error),

    #[error("batch file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Counts returned by `POST /api/v1/feed`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PushResult {
    pub sequence: u64,
    pub posts_received: usize,
    pub posts_saved: usize,
    pub posts_skipped: usize,
    pub posts_errors: usize,
    pub processing_time_ms: i64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

pub struct PushClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl PushClient {
    /// # Errors
    ///
    /// Returns [`PushError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`PushError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> Result<Self, PushError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("polypulse-cli/0.1")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PushError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Push one batch. `feed` is sent as the body's `feed` member unchanged.
    ///
    /// # Errors
    ///
    /// - [`PushError::Rejected`] on a non-2xx response.
    /// - [`PushError::Http`] on network failure or an unreadable body.
    pub async fn push_feed(&self, feed: &Value) -> Result<PushResult, PushError> {
        let url = self.endpoint("api/v1/feed")?;
        let mut request = self
            .client
            .post(url)
            .json(&serde_json::json!({ "feed": feed }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejected(status, response).await);
        }

        let envelope: Envelope<PushResult> = response.json().await?;
        Ok(envelope.data)
    }

    /// Fetch `GET /api/v1/statistics` and return its `data` member.
    ///
    /// # Errors
    ///
    /// Same as [`PushClient::push_feed`].
    pub async fn statistics(&self) -> Result<Value, PushError> {
        let url = self.endpoint("api/v1/statistics")?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejected(status, response).await);
        }

        let envelope: Envelope<Value> = response.json().await?;
        Ok(envelope.data)
    }

    fn endpoint(&self, path: &str) -> Result<Url, PushError> {
        self.base_url.join(path).map_err(|e| PushError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })
    }
}

async fn rejected(status: StatusCode, response: reqwest::Response) -> PushError {
    match response.json::<ErrorEnvelope>().await {
        Ok(body) => PushError::Rejected {
            status,
            code: body.error.code,
            message: body.error.message,
        },
        Err(_) => PushError::Rejected {
            status,
            code: "unknown".to_string(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string(),
        },
    }
}

/// Load a batch from disk.
///
/// Accepts either a bare array of posts or an object wrapping it as `feed`.
///
/// # Errors
///
/// Returns [`PushError::Io`] or [`PushError::Json`] if the file cannot be
/// read or parsed.
pub fn load_batch_file(path: &Path) -> Result<Value, PushError> {
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    Ok(match value {
        Value::Object(mut map) if map.contains_key("feed") => {
            map.remove("feed").unwrap_or(Value::Null)
        }
        other => other,
    })
}

/// Push a batch file and print the server's counts.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the push fails.
pub(crate) async fn run_push(client: &PushClient, path: &Path) -> anyhow::Result<()> {
    let feed = load_batch_file(path)?;
    let posts = feed.as_array().map_or(0, Vec::len);
    tracing::info!(path = %path.display(), posts, "pushing feed batch");

    let result = client.push_feed(&feed).await?;
    println!(
        "batch #{}: received {}, saved {}, skipped {}, errors {} ({} ms)",
        result.sequence,
        result.posts_received,
        result.posts_saved,
        result.posts_skipped,
        result.posts_errors,
        result.processing_time_ms
    );
    Ok(())
}

/// Print the server's live feed health.
///
/// # Errors
///
/// Returns an error if the statistics request fails.
pub(crate) async fn run_health(client: &PushClient) -> anyhow::Result<()> {
    let data = client.statistics().await?;
    let feeding = &data["feeding"];

    println!(
        "status:   {}",
        feeding["feeding_status"].as_str().unwrap_or("unknown")
    );
    println!("health:   {}%", feeding["feeding_health_percentage"]);
    println!(
        "feeds:    {} of {} expected ({} missing)",
        feeding["actual_feed_counter"],
        feeding["expected_feed_counter"],
        feeding["missing_feeds"]
    );
    println!(
        "gap:      {} ms now, {} ms longest",
        feeding["current_unfeed_interval_ms"], feeding["longest_unfeed_interval_ms"]
    );
    println!("posts:    {}", data["posts"]["total_posts"]);
    Ok(())
}

#[cfg(test)]
#[path = "push_test.rs"]
mod tests;
