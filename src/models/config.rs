//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Query;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client behavior settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Listing feed settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Notification delivery settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// File locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Saved searches to run each batch
    #[serde(default)]
    pub queries: Vec<Query>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_attempts == 0 {
            return Err(AppError::validation("http.max_attempts must be > 0"));
        }
        if self.feed.base_url.trim().is_empty() {
            return Err(AppError::validation("feed.base_url is empty"));
        }
        if self.feed.min_items == 0 {
            return Err(AppError::validation("feed.min_items must be > 0"));
        }
        if self.notify.max_attempts == 0 {
            return Err(AppError::validation("notify.max_attempts must be > 0"));
        }
        if self.notify.rate_limit_per_sec == 0 {
            return Err(AppError::validation("notify.rate_limit_per_sec must be > 0"));
        }
        if self.notify.max_in_flight == 0 {
            return Err(AppError::validation("notify.max_in_flight must be > 0"));
        }
        if self.queries.is_empty() {
            return Err(AppError::validation("No queries defined"));
        }
        for query in &self.queries {
            if query.name.trim().is_empty() {
                return Err(AppError::validation("Query with empty name"));
            }
            if query.max_pages == 0 {
                return Err(AppError::validation(format!(
                    "Query '{}': max_pages must be > 0",
                    query.name
                )));
            }
        }
        Ok(())
    }
}

/// HTTP client behavior settings, shared by feed and Telegram calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retry budget per fetch
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "defaults::backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Backoff multiplier applied per attempt
    #[serde(default = "defaults::backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            backoff_base_ms: defaults::backoff_base_ms(),
            backoff_multiplier: defaults::backoff_multiplier(),
        }
    }
}

/// Listing feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL of the paginated feed endpoint
    #[serde(default = "defaults::feed_base_url")]
    pub base_url: String,

    /// Base URL for listing permalinks
    #[serde(default = "defaults::item_base_url")]
    pub item_base_url: String,

    /// Minimum items on a page to keep paginating
    #[serde(default = "defaults::min_items")]
    pub min_items: usize,

    /// Courtesy pause between page requests in milliseconds
    #[serde(default = "defaults::page_delay_ms")]
    pub page_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::feed_base_url(),
            item_base_url: defaults::item_base_url(),
            min_items: defaults::min_items(),
            page_delay_ms: defaults::page_delay_ms(),
        }
    }
}

/// Notification delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Retry budget per message send
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Global outbound send budget per second
    #[serde(default = "defaults::rate_limit_per_sec")]
    pub rate_limit_per_sec: u32,

    /// Global cap on simultaneously in-flight sends
    #[serde(default = "defaults::max_in_flight")]
    pub max_in_flight: usize,

    /// Also send listing coordinates as a location message
    #[serde(default)]
    pub send_location: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            rate_limit_per_sec: defaults::rate_limit_per_sec(),
            max_in_flight: defaults::max_in_flight(),
            send_location: false,
        }
    }
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Durable seen-set file (flat JSON array of listing ids)
    #[serde(default = "defaults::seen_file")]
    pub seen_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            seen_file: defaults::seen_file(),
        }
    }
}

/// One notification destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    /// Human label, used only in logs
    pub label: String,

    /// Telegram chat id
    pub chat_id: i64,
}

/// Secrets supplied via the environment (optionally through a .env file).
#[derive(Debug, Clone)]
pub struct Secrets {
    pub bot_token: String,
    pub recipients: Vec<Recipient>,
}

impl Secrets {
    /// Load the bot credential and recipient list from the environment.
    ///
    /// Recipients come from `CHAT_ID_<LABEL>` variables; unparseable values
    /// are skipped with an error log. Missing token or an empty recipient
    /// list is a configuration error.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::config("TELEGRAM_BOT_TOKEN is not set"))?;

        let mut recipients = Vec::new();
        for (key, value) in std::env::vars() {
            if let Some(label) = key.strip_prefix("CHAT_ID_") {
                match value.trim().parse::<i64>() {
                    Ok(chat_id) => recipients.push(Recipient {
                        label: label.to_string(),
                        chat_id,
                    }),
                    Err(_) => log::error!("Invalid chat id for {}: {}", key, value),
                }
            }
        }

        if recipients.is_empty() {
            return Err(AppError::config("No CHAT_ID_* variables found"));
        }

        // Environment iteration order is unspecified
        recipients.sort_by(|a, b| a.label.cmp(&b.label));

        let labels: Vec<&str> = recipients.iter().map(|r| r.label.as_str()).collect();
        log::info!("Sending to: {}", labels.join(", "));

        Ok(Self {
            bot_token,
            recipients,
        })
    }
}

/// Default values used by serde and Default impls.
mod defaults {
    use std::path::PathBuf;

    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; FlatwatchBot/1.0)".to_string()
    }

    pub fn timeout() -> u64 {
        30
    }

    pub fn max_attempts() -> u32 {
        3
    }

    pub fn backoff_base_ms() -> u64 {
        2000
    }

    pub fn backoff_multiplier() -> f64 {
        2.0
    }

    pub fn feed_base_url() -> String {
        "https://gw.yad2.co.il/feed-search-legacy/realestate/rent".to_string()
    }

    pub fn item_base_url() -> String {
        "https://www.yad2.co.il/item".to_string()
    }

    pub fn min_items() -> usize {
        1
    }

    pub fn page_delay_ms() -> u64 {
        1000
    }

    pub fn rate_limit_per_sec() -> u32 {
        30
    }

    pub fn max_in_flight() -> usize {
        3
    }

    pub fn seen_file() -> PathBuf {
        PathBuf::from("sent_posts.json")
    }
}
