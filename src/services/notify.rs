//! Rate-limited, bounded-concurrency notification fan-out.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Instant, sleep};

use crate::error::{AppError, Result};
use crate::models::{Listing, NotifyConfig, Recipient};
use crate::services::telegram::Messenger;

/// Interval-reservation rate limiter.
///
/// Each acquire reserves the next free send slot and sleeps until it
/// arrives, so a budget of N per second becomes a minimum spacing of 1/N
/// between outbound calls. Acquires never fail, they only wait.
pub struct RateLimiter {
    interval: Duration,
    next: Mutex<Instant>,
}

impl RateLimiter {
    pub fn per_second(rate: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(rate.max(1))),
            next: Mutex::new(Instant::now()),
        }
    }

    pub async fn acquire(&self) {
        let wait = {
            let mut next = self.next.lock().await;
            let now = Instant::now();
            let start = if now >= *next { now } else { *next };
            *next = start + self.interval;
            start.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

/// Delivers one message per listing to every configured recipient.
///
/// The rate limiter and in-flight semaphore are process-wide resources
/// owned here; the orchestrator constructs one Notifier per run and shares
/// it across queries.
pub struct Notifier {
    messenger: Arc<dyn Messenger>,
    recipients: Vec<Recipient>,
    limiter: RateLimiter,
    permits: Semaphore,
    send_location: bool,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn Messenger>, recipients: Vec<Recipient>, cfg: &NotifyConfig) -> Self {
        Self {
            messenger,
            recipients,
            limiter: RateLimiter::per_second(cfg.rate_limit_per_sec),
            permits: Semaphore::new(cfg.max_in_flight.max(1)),
            send_location: cfg.send_location,
        }
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    /// Send the listing to every recipient concurrently.
    ///
    /// Failures are isolated per recipient; returns true only if every
    /// recipient's delivery succeeded within its retry budget.
    pub async fn notify(&self, listing: &Listing) -> bool {
        let sends = self.recipients.iter().map(|recipient| async move {
            match self.deliver(recipient, listing).await {
                Ok(()) => true,
                Err(e) => {
                    log::error!(
                        "Delivery to {} (chat {}) failed: {}",
                        recipient.label,
                        recipient.chat_id,
                        e
                    );
                    false
                }
            }
        });

        let results = futures::future::join_all(sends).await;
        results.iter().all(|ok| *ok)
    }

    async fn deliver(&self, recipient: &Recipient, listing: &Listing) -> Result<()> {
        self.limiter.acquire().await;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AppError::notify(recipient.chat_id, "send queue closed"))?;

        self.messenger
            .send_message(recipient.chat_id, &listing.message_html())
            .await?;

        if self.send_location {
            if let Some(coords) = listing.coords {
                self.limiter.acquire().await;
                self.messenger
                    .send_location(recipient.chat_id, coords.latitude, coords.longitude)
                    .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coords, ListingId};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubMessenger {
        sent: Mutex<Vec<(i64, String)>>,
        locations: Mutex<Vec<i64>>,
        failing_chats: HashSet<i64>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubMessenger {
        fn new(failing_chats: &[i64]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                locations: Mutex::new(Vec::new()),
                failing_chats: failing_chats.iter().copied().collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Messenger for StubMessenger {
        async fn send_message(&self, chat_id: i64, html: &str) -> Result<()> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_chats.contains(&chat_id) {
                return Err(AppError::notify(chat_id, "stub failure"));
            }
            self.sent.lock().await.push((chat_id, html.to_string()));
            Ok(())
        }

        async fn send_location(&self, chat_id: i64, _lat: f64, _lon: f64) -> Result<()> {
            if self.failing_chats.contains(&chat_id) {
                return Err(AppError::notify(chat_id, "stub failure"));
            }
            self.locations.lock().await.push(chat_id);
            Ok(())
        }
    }

    fn listing(coords: Option<Coords>) -> Listing {
        Listing {
            id: ListingId::Num(1),
            title: "Herzl 10".to_string(),
            price: "3,200 ₪".to_string(),
            query_name: "Test".to_string(),
            link: "https://www.yad2.co.il/item/1".to_string(),
            coords,
        }
    }

    fn recipients(ids: &[i64]) -> Vec<Recipient> {
        ids.iter()
            .map(|id| Recipient {
                label: format!("chat{}", id),
                chat_id: *id,
            })
            .collect()
    }

    fn config(max_in_flight: usize, send_location: bool) -> NotifyConfig {
        NotifyConfig {
            max_in_flight,
            send_location,
            rate_limit_per_sec: 10_000,
            ..NotifyConfig::default()
        }
    }

    #[tokio::test]
    async fn test_all_recipients_reached() {
        let stub = Arc::new(StubMessenger::new(&[]));
        let notifier = Notifier::new(stub.clone(), recipients(&[1, 2, 3]), &config(3, false));

        assert!(notifier.notify(&listing(None)).await);

        let sent = stub.sent.lock().await;
        let chats: HashSet<i64> = sent.iter().map(|(id, _)| *id).collect();
        assert_eq!(chats, HashSet::from([1, 2, 3]));
        assert!(sent[0].1.contains("Herzl 10"));
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_recipient() {
        let stub = Arc::new(StubMessenger::new(&[2]));
        let notifier = Notifier::new(stub.clone(), recipients(&[1, 2, 3]), &config(3, false));

        assert!(!notifier.notify(&listing(None)).await);

        // The failing chat does not block delivery to the others.
        let sent = stub.sent.lock().await;
        let chats: HashSet<i64> = sent.iter().map(|(id, _)| *id).collect();
        assert_eq!(chats, HashSet::from([1, 3]));
    }

    #[tokio::test]
    async fn test_in_flight_cap_respected() {
        let stub = Arc::new(StubMessenger::new(&[]));
        let notifier = Notifier::new(stub.clone(), recipients(&[1, 2, 3, 4, 5]), &config(2, false));

        assert!(notifier.notify(&listing(None)).await);
        assert!(stub.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_location_follows_message_when_enabled() {
        let stub = Arc::new(StubMessenger::new(&[]));
        let notifier = Notifier::new(stub.clone(), recipients(&[7]), &config(3, true));

        let with_coords = listing(Some(Coords {
            latitude: 32.06,
            longitude: 34.77,
        }));
        assert!(notifier.notify(&with_coords).await);
        assert_eq!(*stub.locations.lock().await, vec![7]);

        // No coordinates: text message only, still a success.
        assert!(notifier.notify(&listing(None)).await);
        assert_eq!(stub.locations.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_acquires() {
        let limiter = RateLimiter::per_second(50);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        // Two reserved intervals of 20ms each.
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
