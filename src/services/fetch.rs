//! Feed fetch client.
//!
//! Performs a single idempotent GET with bounded retries and exponential
//! backoff, decoding the response as a JSON envelope. 429/503 honor a
//! server-supplied Retry-After delay when present.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::services::retry::{RetryPolicy, is_throttled, retry_after};

/// Seam for the paginator; lets tests drive it with canned pages.
#[async_trait]
pub trait FeedFetch: Send + Sync {
    /// Fetch one feed page and decode it as JSON.
    async fn fetch_page(&self, url: &str) -> Result<Value>;
}

/// HTTP client for the listing feed.
pub struct FeedClient {
    client: Client,
    retry: RetryPolicy,
}

impl FeedClient {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl FeedFetch for FeedClient {
    async fn fetch_page(&self, url: &str) -> Result<Value> {
        for attempt in 1..=self.retry.max_attempts {
            let mut delay = self.retry.delay_for(attempt);

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.json::<Value>().await {
                            Ok(value) => {
                                log::debug!("Fetched {} (attempt {})", url, attempt);
                                return Ok(value);
                            }
                            Err(e) => {
                                log::warn!("Attempt {}: invalid JSON from {}: {}", attempt, url, e)
                            }
                        }
                    } else {
                        if is_throttled(status) {
                            if let Some(server_delay) = retry_after(response.headers()) {
                                delay = server_delay;
                            }
                        }
                        log::warn!(
                            "Attempt {}: status {} for {}. Retrying after {:?}.",
                            attempt,
                            status.as_u16(),
                            url,
                            delay
                        );
                    }
                }
                Err(e) if e.is_timeout() => {
                    log::warn!("Attempt {}: timeout fetching {}: {}", attempt, url, e)
                }
                Err(e) => log::warn!("Attempt {}: network error fetching {}: {}", attempt, url, e),
            }

            if attempt < self.retry.max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(AppError::fetch(
            url,
            format!("giving up after {} attempts", self.retry.max_attempts),
        ))
    }
}
