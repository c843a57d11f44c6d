//! Client-side throttling: a token bucket for request rate and a per-host cap on
//! concurrent connections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, sleep};

/// Upper bound on a single wait; `acquire` re-checks the bucket afterwards.
const MAX_WAIT: Duration = Duration::from_secs(60);

/// Token bucket shared by every call issued through one transport.
///
/// [`RateLimiter::acquire`] waits for a token instead of rejecting, so concurrent
/// callers queue up for the same budget. Up to `burst` requests may go out at once
/// after an idle period.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Takes one token, or reports how long until one becomes available.
    fn try_take(&mut self, now: Instant) -> Option<Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let missing = 1.0 - self.tokens;
            let wait = Duration::try_from_secs_f64(missing / self.refill_per_sec).unwrap_or(MAX_WAIT);
            Some(wait.min(MAX_WAIT))
        }
    }
}

impl RateLimiter {
    /// Returns `None` when the parameters disable limiting (non-positive rate or zero burst).
    pub fn new(requests_per_second: f64, burst: u32) -> Option<Self> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 || burst == 0 {
            return None;
        }
        let capacity = f64::from(burst);
        Some(Self {
            bucket: Mutex::new(TokenBucket {
                capacity,
                tokens: capacity,
                refill_per_sec: requests_per_second,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Waits until a request slot is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                match bucket.try_take(Instant::now()) {
                    None => return,
                    Some(wait) => wait,
                }
            };
            tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limiter waiting");
            sleep(wait).await;
        }
    }
}

/// Caps concurrent in-flight requests per host.
#[derive(Debug)]
pub struct ConnectionLimiter {
    per_host: usize,
    hosts: StdMutex<HashMap<String, Arc<Semaphore>>>,
}

impl ConnectionLimiter {
    /// Returns `None` when `per_host` is zero, meaning unlimited.
    pub fn new(per_host: usize) -> Option<Self> {
        (per_host > 0).then(|| Self {
            per_host,
            hosts: StdMutex::new(HashMap::new()),
        })
    }

    /// Waits for a connection slot on the host of `url`.
    ///
    /// Returns `None` when the semaphore bookkeeping is unusable (poisoned map or a
    /// closed semaphore); the request then proceeds without a slot rather than failing.
    pub async fn acquire(&self, url: &str) -> Option<OwnedSemaphorePermit> {
        let semaphore = {
            let mut hosts = self.hosts.lock().ok()?;
            hosts
                .entry(host_key(url))
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
                .clone()
        };
        semaphore.acquire_owned().await.ok()
    }
}

fn host_key(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => format!(
            "{}:{}",
            parsed.host_str().unwrap_or_default(),
            parsed.port_or_known_default().unwrap_or_default()
        ),
        Err(_) => url.to_string(),
    }
}
