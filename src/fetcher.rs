//! HTTP page fetching using wreq for TLS fingerprint emulation.

use crate::config::Config;
use crate::error::{FetchError, FetchErrorKind};
use crate::retry::{retry_with_backoff, RetryPolicy};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::RngExt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use wreq::Client;
use wreq_util::Emulation;

/// Fetches pages with retry and backoff - enables stubbing for tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, making at most `attempt_budget` attempts.
    async fn fetch(&self, url: &str, attempt_budget: u32) -> Result<String, FetchError>;
}

/// Page fetcher with browser impersonation and backoff.
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    accept_language: String,
    delay_ms: u64,
    delay_jitter_ms: u64,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            policy: config.retry_policy(),
            accept_language: config.region.accept_language().to_string(),
            delay_ms: config.delay_ms,
            delay_jitter_ms: config.delay_jitter_ms,
        })
    }

    /// Performs one GET and classifies any failure.
    async fn get_once(&self, url: &str) -> Result<String, FetchError> {
        self.delay().await;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8")
            .header("Accept-Language", self.accept_language.as_str())
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| classify_send_error(url, &e))?;

        let status = response.status().as_u16();
        debug!("Response status: {}", status);

        if let Some(err) = classify_status(url, status) {
            if err.kind == FetchErrorKind::RateLimited {
                warn!("Rate limited ({}). Consider using a proxy or increasing delay.", status);
            }
            return Err(err);
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::transient(url, format!("failed to read body: {}", e)))
    }

    /// Adds a random delay to mimic human behavior.
    async fn delay(&self) {
        if self.delay_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        debug!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, attempt_budget: u32) -> Result<String, FetchError> {
        if !is_well_formed(url) {
            return Err(FetchError::permanent(url, "malformed URL"));
        }

        let policy = self.policy.with_budget(attempt_budget);
        retry_with_backoff(policy, || self.get_once(url)).await
    }
}

/// Only absolute http(s) URLs with a host are fetched; anything else fails
/// permanently without I/O.
fn is_well_formed(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Maps an HTTP status to a fetch error, or `None` on success.
fn classify_status(url: &str, status: u16) -> Option<FetchError> {
    match status {
        200..=299 => None,
        // Amazon answers throttled clients with 503
        429 | 503 => Some(FetchError::rate_limited(url, format!("status {}", status))),
        408 => Some(FetchError::transient(url, "status 408")),
        500..=599 => Some(FetchError::transient(url, format!("status {}", status))),
        _ => Some(FetchError::permanent(url, format!("status {}", status))),
    }
}

/// Send failures (timeouts, resets, refused connections) are worth another try;
/// malformed URLs are rejected before any request is built.
fn classify_send_error(url: &str, err: &wreq::Error) -> FetchError {
    FetchError::transient(url, format!("request failed: {}", err))
}
