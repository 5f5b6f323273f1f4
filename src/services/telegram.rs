//! Telegram Bot API messenger.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::services::retry::{RetryPolicy, is_throttled, retry_after};

/// Outbound messaging seam. Telegram is the only implementation; stubs
/// stand in for it in pipeline tests.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML-formatted text message to one chat.
    async fn send_message(&self, chat_id: i64, html: &str) -> Result<()>;

    /// Send a location pin to one chat.
    async fn send_location(&self, chat_id: i64, latitude: f64, longitude: f64) -> Result<()>;
}

/// Messenger backed by the Telegram Bot HTTP API.
pub struct TelegramMessenger {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl TelegramMessenger {
    pub fn new(client: Client, bot_token: &str, retry: RetryPolicy) -> Self {
        Self::with_base_url(
            client,
            format!("https://api.telegram.org/bot{}", bot_token),
            retry,
        )
    }

    /// Point at a different API server (used for stub endpoints).
    pub fn with_base_url(client: Client, base_url: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url,
            retry,
        }
    }

    /// POST one API method with the shared 429/503 + backoff discipline.
    ///
    /// Any non-throttling error status is a hard failure for the whole send:
    /// Telegram rejects malformed requests deterministically, so retrying
    /// them only burns the rate budget.
    async fn post_with_retry(
        &self,
        method: &str,
        params: &[(&str, String)],
        chat_id: i64,
    ) -> Result<()> {
        let url = format!("{}/{}", self.base_url, method);

        for attempt in 1..=self.retry.max_attempts {
            let mut delay = self.retry.delay_for(attempt);

            match self.client.post(&url).form(params).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        log::info!("{} delivered to chat {}", method, chat_id);
                        return Ok(());
                    }
                    if is_throttled(status) {
                        if let Some(server_delay) = retry_after(response.headers()) {
                            delay = server_delay;
                        }
                        log::warn!(
                            "Attempt {}: {} to chat {} throttled ({}). Retrying after {:?}.",
                            attempt,
                            method,
                            chat_id,
                            status.as_u16(),
                            delay
                        );
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        return Err(AppError::notify(
                            chat_id,
                            format!("{} rejected with {}: {}", method, status.as_u16(), body),
                        ));
                    }
                }
                Err(e) => log::warn!(
                    "Attempt {}: {} to chat {} failed: {}",
                    attempt,
                    method,
                    chat_id,
                    e
                ),
            }

            if attempt < self.retry.max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(AppError::notify(
            chat_id,
            format!(
                "{} gave up after {} attempts",
                method, self.retry.max_attempts
            ),
        ))
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(&self, chat_id: i64, html: &str) -> Result<()> {
        let params = [
            ("chat_id", chat_id.to_string()),
            ("text", html.to_string()),
            ("parse_mode", "HTML".to_string()),
        ];
        self.post_with_retry("sendMessage", &params, chat_id).await
    }

    async fn send_location(&self, chat_id: i64, latitude: f64, longitude: f64) -> Result<()> {
        let params = [
            ("chat_id", chat_id.to_string()),
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
        ];
        self.post_with_retry("sendLocation", &params, chat_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::services::stub_http::{http_response, serve};

    fn messenger(base_url: String, max_attempts: u32) -> TelegramMessenger {
        TelegramMessenger::with_base_url(
            Client::new(),
            base_url,
            RetryPolicy::new(max_attempts, Duration::from_millis(5), 2.0),
        )
    }

    #[tokio::test]
    async fn test_throttled_send_waits_for_retry_after_then_succeeds() {
        let (base_url, hits) = serve(vec![
            http_response("429 Too Many Requests", &[("Retry-After", "1")], ""),
            http_response(
                "200 OK",
                &[("Content-Type", "application/json")],
                r#"{"ok":true}"#,
            ),
        ])
        .await;

        let start = Instant::now();
        messenger(base_url, 3)
            .send_message(7, "<b>hello</b>")
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_rejected_send_is_not_retried() {
        let (base_url, hits) = serve(vec![http_response(
            "400 Bad Request",
            &[("Content-Type", "application/json")],
            r#"{"ok":false,"description":"Bad Request: can't parse entities"}"#,
        )])
        .await;

        let err = messenger(base_url, 3)
            .send_message(7, "<b>broken")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("400"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
