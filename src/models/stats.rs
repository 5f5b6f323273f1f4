//! Aggregate counters for one batch run.

use chrono::{DateTime, Utc};

/// Counts collected while a batch of queries runs.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Number of queries in the batch
    pub queries: usize,

    /// Pages successfully fetched and decoded
    pub pages_fetched: usize,

    /// Genuinely new listings notified this run
    pub new_listings: usize,

    /// Raw items skipped (no usable id)
    pub skipped_items: usize,

    /// Listings for which at least one recipient send failed
    pub send_failures: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn new(queries: usize) -> Self {
        Self {
            queries,
            pages_fetched: 0,
            new_listings: 0,
            skipped_items: 0,
            send_failures: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mark the batch finished and log the run summary.
    pub fn finish(&mut self) {
        let finished = Utc::now();
        self.finished_at = Some(finished);

        let elapsed = finished - self.started_at;
        log::info!(
            "Summary: searched {} queries over {} pages and found {} new listings ({}.{:03}s)",
            self.queries,
            self.pages_fetched,
            self.new_listings,
            elapsed.num_seconds(),
            elapsed.num_milliseconds().rem_euclid(1000),
        );
        if self.skipped_items > 0 {
            log::info!("    skipped {} items without a usable id", self.skipped_items);
        }
        if self.send_failures > 0 {
            log::warn!(
                "    {} listings had at least one failed recipient send",
                self.send_failures
            );
        }
    }
}
