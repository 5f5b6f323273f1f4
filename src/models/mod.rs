//! Data model for queries, listings, and configuration.

pub mod config;
pub mod listing;
pub mod query;
pub mod stats;

pub use config::{Config, FeedConfig, HttpConfig, NotifyConfig, PathsConfig, Recipient, Secrets};
pub use listing::{Coords, Listing, ListingId};
pub use query::{DedupKey, FilterValue, Query};
pub use stats::RunStats;
