//! Saved search configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One saved search against the listing feed.
///
/// Filters are passed through to the feed verbatim as query-string
/// parameters; list values encode as repeated keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    /// Display name, used in messages and logs
    pub name: String,

    /// Page budget for one run
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Deduplication key strategy
    #[serde(default)]
    pub dedup_key: DedupKey,

    /// Free-form feed filters (area, city, rooms, price, neighborhood, ...)
    #[serde(default)]
    pub filters: BTreeMap<String, FilterValue>,
}

fn default_max_pages() -> u32 {
    10
}

/// Which raw-item field identifies a listing for duplicate suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DedupKey {
    /// Stable listing id (`id` / `item_id` / `itemId`)
    #[default]
    Id,

    /// `date_added` timestamp, falling back to the id chain.
    /// Weaker granularity: listings added in the same instant collapse.
    DateAdded,
}

/// A single filter value from the query configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Float(f64),
    Many(Vec<String>),
}
