//! Batch orchestration.
//!
//! Sequences the configured queries against the pipeline, aggregates
//! counts, and persists the seen set exactly once after the full batch.
//! Queries run sequentially, so the seen set needs no locking.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::{Config, RunStats, Secrets};
use crate::pipeline::paginate::run_query;
use crate::services::fetch::{FeedClient, FeedFetch};
use crate::services::notify::Notifier;
use crate::services::retry::RetryPolicy;
use crate::services::telegram::TelegramMessenger;
use crate::storage::{LocalSeenStore, SeenStorage};
use crate::utils::http::build_client;

/// Run one batch against the live feed and Telegram API.
pub async fn run_batch(config: &Config, secrets: &Secrets) -> Result<RunStats> {
    let client = build_client(&config.http)?;

    let fetcher = FeedClient::new(client.clone(), RetryPolicy::for_fetch(&config.http));
    let messenger = TelegramMessenger::new(
        client,
        &secrets.bot_token,
        RetryPolicy::for_notify(&config.http, config.notify.max_attempts),
    );
    let notifier = Notifier::new(
        Arc::new(messenger),
        secrets.recipients.clone(),
        &config.notify,
    );
    let store = LocalSeenStore::new(&config.paths.seen_file);

    run_queries(config, &fetcher, &notifier, &store).await
}

/// Run all queries through injected collaborators.
pub async fn run_queries(
    config: &Config,
    fetcher: &dyn FeedFetch,
    notifier: &Notifier,
    store: &dyn SeenStorage,
) -> Result<RunStats> {
    let mut seen = store.load().await?;
    let mut stats = RunStats::new(config.queries.len());

    log::info!(
        "Starting batch: {} queries, {} recipients, {} previously seen",
        config.queries.len(),
        notifier.recipient_count(),
        seen.len()
    );

    for query in &config.queries {
        let found = run_query(query, &config.feed, fetcher, notifier, &mut seen, &mut stats).await;
        log::info!("Query '{}' found {} new listings", query.name, found);
    }

    if let Err(e) = store.persist(&seen).await {
        // In-memory additions stand; losing the write only means the next
        // run may re-notify, which the commit policy accepts.
        log::error!("Failed to persist seen set: {}", e);
    }

    stats.finish();
    Ok(stats)
}

/// Run batches forever on a fixed interval.
///
/// A failed batch is logged and the loop keeps going; only configuration
/// errors before the first batch abort the watcher.
pub async fn run_watch(config: &Config, secrets: &Secrets, every: Duration) -> Result<()> {
    let mut tick = tokio::time::interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;
        match run_batch(config, secrets).await {
            Ok(stats) => log::info!("Batch complete: {} new listings", stats.new_listings),
            Err(e) => log::error!("Batch failed: {}", e),
        }
    }
}
