//! External service clients: feed fetch and Telegram delivery.

pub mod fetch;
pub mod notify;
pub mod retry;
#[cfg(test)]
pub(crate) mod stub_http;
pub mod telegram;

pub use fetch::{FeedClient, FeedFetch};
pub use notify::{Notifier, RateLimiter};
pub use retry::RetryPolicy;
pub use telegram::{Messenger, TelegramMessenger};
