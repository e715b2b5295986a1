//! Request pacing for exchange API calls
//!
//! The exchange enforces per-endpoint request rates; exceeding them earns
//! HTTP 429 responses. [`RateLimiter`] spaces consecutive requests by a
//! minimum interval, shared across clones so every call path of one client
//! draws from the same budget.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Limiter spacing requests by `min_interval`
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Limiter allowing at most `requests_per_second` calls per second
    pub fn per_second(requests_per_second: u32) -> Self {
        let rps = requests_per_second.max(1);
        Self::new(Duration::from_millis(1_000 / rps as u64))
    }

    /// Wait until the next request slot is available
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.min_interval;
            slot
        };
        sleep_until(slot).await;
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
