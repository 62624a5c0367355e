//! Token-bucket rate limiter for NCBI E-utilities requests.
//!
//! NCBI allows 3 requests/second without an API key and 10/second with one.
//! The bucket starts full (capacity equals the per-second rate, floored at
//! one token so fractional rates can still accumulate a whole request) and
//! refills continuously in proportion to elapsed time.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

use crate::error::Error;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Async token-bucket limiter. Cloning shares the bucket, so every clone
/// draws from the same budget.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    bucket: Arc<Mutex<Bucket>>,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` requests per second.
    ///
    /// Returns [`Error::InvalidRateLimit`] if the rate is zero, negative,
    /// or not finite.
    pub fn new(rate: f64) -> Result<Self, Error> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::InvalidRateLimit(rate));
        }
        // A capacity below one token would make acquire() unsatisfiable
        // for rates under 1/s, so the bucket always holds at least one.
        let capacity = rate.max(1.0);
        Ok(Self {
            rate,
            capacity,
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            })),
        })
    }

    /// Requests per second this limiter was configured with.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Wait until a token is available, then consume it.
    ///
    /// The token check is repeated after each sleep rather than assumed,
    /// since another task may have drained the bucket in the meantime.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                (1.0 - bucket.tokens) / self.rate
            };
            sleep(Duration::from_secs_f64(wait)).await;
        }
    }
}
