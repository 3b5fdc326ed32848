//! A small self-contained token-bucket limiter keyed by `userID`, hand-rolled
//! rather than pulling in a dedicated crate for one gate.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-key token bucket. `capacity` tokens refill at `refill_per_sec` tokens
/// per second; a `Search` call costs one token.
pub struct TokenBucketLimiter {
    buckets: DashMap<String, Mutex<Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl TokenBucketLimiter {
    #[must_use]
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_per_sec,
        }
    }

    /// Returns `Ok(())` if a token was available, or `Err(retry_after)` with
    /// the wait time until the next token would be available.
    pub fn try_acquire(&self, key: &str) -> Result<(), Duration> {
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                Mutex::new(Bucket {
                    tokens: self.capacity,
                    last_refill: Instant::now(),
                })
            });
        let mut bucket = entry.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - bucket.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_per_sec))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_burst_up_to_capacity_then_rejects() {
        let limiter = TokenBucketLimiter::new(2.0, 1.0);
        assert!(limiter.try_acquire("alice").is_ok());
        assert!(limiter.try_acquire("alice").is_ok());
        assert!(limiter.try_acquire("alice").is_err());
    }

    #[test]
    fn buckets_are_independent_per_key() {
        let limiter = TokenBucketLimiter::new(1.0, 1.0);
        assert!(limiter.try_acquire("alice").is_ok());
        assert!(limiter.try_acquire("bob").is_ok());
    }
}
