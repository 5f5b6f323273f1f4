//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::Result;
use crate::models::{FilterValue, Query};

/// Build the feed URL for one page of a query.
///
/// Filters pass through verbatim; list values become repeated keys. The
/// 1-based `page` parameter is appended last.
pub fn feed_url(base: &str, query: &Query, page: u32) -> Result<Url> {
    let mut url = Url::parse(base)?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &query.filters {
            match value {
                FilterValue::Text(s) => {
                    pairs.append_pair(key, s);
                }
                FilterValue::Int(n) => {
                    pairs.append_pair(key, &n.to_string());
                }
                FilterValue::Float(x) => {
                    pairs.append_pair(key, &x.to_string());
                }
                FilterValue::Many(values) => {
                    for v in values {
                        pairs.append_pair(key, v);
                    }
                }
            }
        }
        pairs.append_pair("page", &page.to_string());
    }
    Ok(url)
}

/// Escape the HTML-reserved characters Telegram cares about.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
