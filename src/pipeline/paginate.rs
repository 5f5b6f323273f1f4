//! Per-query pagination loop.
//!
//! Drives the fetch client across successive pages of one query, filtering
//! items through the seen set and handing genuinely new listings to the
//! notifier. Pages are fetched strictly in order because every stopping
//! decision depends on the previous page's content.

use std::time::Duration;

use serde_json::Value;

use crate::models::{FeedConfig, Query, RunStats};
use crate::pipeline::normalize::normalize;
use crate::services::fetch::FeedFetch;
use crate::services::notify::Notifier;
use crate::storage::SeenSet;
use crate::utils::feed_url;

/// Item list at the feed's fixed envelope path, when the shape matches.
pub fn extract_items(envelope: &Value) -> Option<&Vec<Value>> {
    envelope.get("data")?.get("feed")?.get("feed_items")?.as_array()
}

/// Run one query to completion; returns the number of new listings found.
///
/// Stopping policy, in order: fetch failure, malformed envelope, sparse
/// page (below `min_items`, left unprocessed as "end of results"), page
/// budget exhausted. Between pages a fixed courtesy pause keeps the feed's
/// rate limit happy; it is not a backoff and is never retried.
///
/// The count covers every new listing attempted, including ones whose
/// delivery partially failed; those also bump `stats.send_failures`.
pub async fn run_query(
    query: &Query,
    feed: &FeedConfig,
    fetcher: &dyn FeedFetch,
    notifier: &Notifier,
    seen: &mut SeenSet,
    stats: &mut RunStats,
) -> usize {
    let mut new_count = 0;

    for page in 1..=query.max_pages {
        let url = match feed_url(&feed.base_url, query, page) {
            Ok(url) => url,
            Err(e) => {
                log::error!("Query '{}': cannot build feed URL: {}", query.name, e);
                break;
            }
        };

        log::info!("Searching '{}' (page {})", query.name, page);
        log::debug!("Fetching URL: {}", url);

        let envelope = match fetcher.fetch_page(url.as_str()).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Query '{}': page {}: {}", query.name, page, e);
                break;
            }
        };
        stats.pages_fetched += 1;

        let Some(items) = extract_items(&envelope) else {
            log::warn!("No valid feed found for '{}' (page {})", query.name, page);
            break;
        };

        log::info!(
            "Page {} of '{}' contains {} feed items",
            page,
            query.name,
            items.len()
        );

        if items.len() < feed.min_items {
            log::info!(
                "Page {} of '{}' has fewer items ({}) than expected ({}). Stopping pagination.",
                page,
                query.name,
                items.len(),
                feed.min_items
            );
            break;
        }

        new_count += process_items(items, query, feed, notifier, seen, stats).await;

        if page < query.max_pages && feed.page_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(feed.page_delay_ms)).await;
        }
    }

    stats.new_listings += new_count;
    new_count
}

/// Filter one page of raw items through the seen set and notify the rest.
async fn process_items(
    items: &[Value],
    query: &Query,
    feed: &FeedConfig,
    notifier: &Notifier,
    seen: &mut SeenSet,
    stats: &mut RunStats,
) -> usize {
    let mut count = 0;

    for raw in items {
        let Some(listing) = normalize(raw, query, &feed.item_base_url) else {
            log::debug!("Skipping item without a usable id: {}", raw);
            stats.skipped_items += 1;
            continue;
        };

        if seen.contains(&listing.id) {
            log::debug!("Listing {} already sent. Skipping.", listing.id);
            continue;
        }

        let delivered = notifier.notify(&listing).await;

        // Commit policy: the identity is marked seen even when some
        // recipient's send ultimately failed, so a rerun can never spam the
        // recipients that already got the message.
        seen.insert(listing.id.clone());
        count += 1;

        if delivered {
            log::info!(
                "New listing: id {}, title '{}', price {}",
                listing.id,
                listing.title,
                listing.price
            );
        } else {
            stats.send_failures += 1;
            log::error!(
                "Failed to reach all recipients for listing {}. Marked as sent to prevent duplicates.",
                listing.id
            );
        }
    }

    count
}
