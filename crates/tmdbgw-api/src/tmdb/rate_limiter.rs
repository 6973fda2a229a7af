//! TMDB API rate governor (token bucket).

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Window the configured `rate_limit` is expressed in (requests per 10s).
pub const RATE_WINDOW: Duration = Duration::from_secs(10);

/// Waits shorter than this are not logged.
const WAIT_LOG_THRESHOLD: Duration = Duration::from_millis(1);

/// Signal returned when the caller cancelled before a token was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate governor wait cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Mutable bucket state. Only ever touched under the governor's lock.
#[derive(Debug)]
struct Bucket {
    /// Tokens currently available, always in `[0, capacity]`.
    tokens: u32,
    /// Instant the last whole token was credited.
    last_refill: Instant,
}

impl Bucket {
    /// Credits every whole refill interval elapsed since `last_refill`.
    fn refill(&mut self, now: Instant, capacity: u32, interval: Duration) {
        if self.tokens >= capacity {
            self.tokens = capacity;
            self.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = elapsed
            .as_nanos()
            .checked_div(interval.as_nanos().max(1))
            .unwrap_or(0);
        if earned == 0 {
            return;
        }

        let earned = u32::try_from(earned).unwrap_or(u32::MAX);
        let missing = capacity.saturating_sub(self.tokens);
        if earned >= missing {
            self.tokens = capacity;
            self.last_refill = now;
        } else {
            self.tokens = self.tokens.saturating_add(earned);
            self.last_refill = self
                .last_refill
                .checked_add(interval.saturating_mul(earned))
                .unwrap_or(now);
        }
    }

    /// Time until the next token is credited.
    fn until_next(&self, now: Instant, interval: Duration) -> Duration {
        self.last_refill
            .checked_add(interval)
            .map_or(interval, |next| next.saturating_duration_since(now))
    }
}

/// Token-bucket admission gate shared by every request of one client.
///
/// Holds `capacity` tokens and credits one every `refill_interval`. A fresh
/// governor allows a burst of `capacity` requests with no wait. Waiting
/// callers are not queued in arrival order; whoever takes the lock after a
/// refill wins, and since refills never stop no caller waits forever.
#[derive(Debug)]
pub struct RateGovernor {
    /// Maximum burst size.
    capacity: u32,
    /// Time to credit one token.
    refill_interval: Duration,
    /// Token count and last refill, behind a single lock.
    bucket: Mutex<Bucket>,
}

impl RateGovernor {
    /// Creates a governor with `capacity` tokens refilled one per `refill_interval`.
    ///
    /// A zero capacity is raised to 1.
    #[must_use]
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        tracing::info!(
            capacity,
            refill_interval_ms = u64::try_from(refill_interval.as_millis()).unwrap_or(u64::MAX),
            component = "rate_governor",
            "Rate governor initialized"
        );
        Self {
            capacity,
            refill_interval,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Creates a governor allowing `requests` per `window`.
    ///
    /// The refill interval is `window / requests` and the burst is `requests`.
    #[must_use]
    pub fn per_window(requests: u32, window: Duration) -> Self {
        let requests = requests.max(1);
        let interval = window.checked_div(requests).unwrap_or(window);
        Self::new(requests, interval)
    }

    /// Maximum burst size.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Time to credit one token.
    #[must_use]
    pub const fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Tokens available right now.
    pub async fn available(&self) -> u32 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(Instant::now(), self.capacity, self.refill_interval);
        bucket.tokens
    }

    /// Waits for a token and consumes it.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if `cancel` fires before a token is granted. No
    /// token is consumed in that case.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let started = Instant::now();
        loop {
            let wait = {
                let mut bucket = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(self.cancelled(started)),
                    guard = self.bucket.lock() => guard,
                };
                let now = Instant::now();
                bucket.refill(now, self.capacity, self.refill_interval);
                if bucket.tokens > 0 {
                    bucket.tokens = bucket.tokens.saturating_sub(1);
                    drop(bucket);
                    self.granted(started);
                    return Ok(());
                }
                bucket.until_next(now, self.refill_interval)
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.cancelled(started)),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    fn granted(&self, started: Instant) {
        let waited = started.elapsed();
        if waited > WAIT_LOG_THRESHOLD {
            tracing::debug!(
                wait_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                capacity = self.capacity,
                component = "rate_governor",
                "Rate governor wait completed"
            );
        }
    }

    #[allow(clippy::unused_self)]
    fn cancelled(&self, started: Instant) -> Cancelled {
        tracing::warn!(
            wait_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            component = "rate_governor",
            "Rate governor wait cancelled"
        );
        Cancelled
    }
}
