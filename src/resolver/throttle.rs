// ⏱️ Throttle + Retry - keep batch lookups under the provider's rate limit
// One Throttle is shared (Arc) by every resolver in the process.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

// ============================================================================
// TOKEN BUCKET
// ============================================================================

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket permit source. `acquire` blocks the calling thread until a
/// permit is available.
#[derive(Debug)]
pub struct Throttle {
    bucket: Mutex<Bucket>,
    /// tokens per second
    rate: f64,
    capacity: f64,
}

impl Throttle {
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        let capacity = burst.max(1) as f64;
        Throttle {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            rate: requests_per_minute.max(1) as f64 / 60.0,
            capacity,
        }
    }

    /// No effective limit; for tests and offline tables
    pub fn unlimited() -> Self {
        Throttle::new(u32::MAX, u32::MAX)
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("throttle mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
        bucket.last_refill = now;
    }

    /// Take a permit now if one is available
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.lock();
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until the next permit frees up
    pub fn time_until_available(&self) -> Duration {
        let mut bucket = self.lock();
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
        }
    }

    /// Block until a permit is granted
    pub fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            let wait = self.time_until_available();
            if !wait.is_zero() {
                tracing::debug!(wait_ms = wait.as_millis() as u64, "waiting for lookup permit");
                std::thread::sleep(wait);
            }
        }
    }
}

// ============================================================================
// RETRY POLICY
// ============================================================================

/// Exponential backoff: delay(n) = base × factor^n, capped at `max_delay`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 4,
            base_delay_ms: 200,
            factor: 2.0,
            max_delay_ms: 3_000,
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, for tests
    pub fn immediate(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            base_delay_ms: 0,
            factor: 1.0,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = self.base_delay_ms as f64 * self.factor.powi(attempt as i32);
        let capped = ms.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// The server's hint wins when it asks for longer than our own backoff
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let own = self.delay(attempt);
        match retry_after {
            Some(hint) if hint > own => hint.min(Duration::from_millis(self.max_delay_ms.max(1) * 10)),
            _ => own,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_burst_then_empty() {
        let throttle = Throttle::new(1, 3);
        assert!(throttle.try_acquire());
        assert!(throttle.try_acquire());
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
        assert!(throttle.time_until_available() > Duration::from_secs(1));
    }

    #[test]
    fn test_acquire_waits_for_refill() {
        // 600/min = one token every 100ms
        let throttle = Throttle::new(600, 1);
        throttle.acquire();

        let start = Instant::now();
        throttle.acquire();
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_shared_across_threads() {
        let throttle = Arc::new(Throttle::new(1, 4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = Arc::clone(&throttle);
                std::thread::spawn(move || t.try_acquire())
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(granted, 4);
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(200));
        assert_eq!(policy.delay(1), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(1_600));
        assert_eq!(policy.delay(10), Duration::from_millis(3_000));

        assert_eq!(
            policy.delay_with_hint(0, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.delay_with_hint(2, Some(Duration::from_millis(10))),
            Duration::from_millis(800)
        );
        assert_eq!(RetryPolicy::immediate(3).delay(2), Duration::ZERO);
    }
}
