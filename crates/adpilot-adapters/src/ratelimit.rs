//! Token-bucket rate limiting for adapter calls.
//!
//! Each adapter owns one bucket sized to its platform's limits. When the
//! bucket is dry the caller gets `RateLimited { retry_after_secs }`, so the
//! engine can defer the platform instead of tight-looping.

use parking_lot::Mutex;
use std::time::Instant;

use adpilot_core::AdapterError;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket with a configurable burst and refill rate.
#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    burst: u32,
    refill_per_sec: f64,
}

impl TokenBucket {
    pub fn new(burst: u32, refill_per_sec: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: burst as f64,
                last_refill: Instant::now(),
            }),
            burst,
            refill_per_sec,
        }
    }

    /// Refill based on elapsed time, then try to consume one token.
    pub fn try_acquire(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.burst as f64);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            Err(AdapterError::RateLimited {
                retry_after_secs: self.retry_after(state.tokens),
            })
        }
    }

    /// Seconds until the next token is available.
    fn retry_after(&self, tokens: f64) -> u64 {
        if self.refill_per_sec <= 0.0 {
            return 60;
        }
        let needed = 1.0 - tokens;
        (needed / self.refill_per_sec).ceil().max(1.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_burst_then_limits() {
        let bucket = TokenBucket::new(3, 0.0);
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        match bucket.try_acquire() {
            Err(AdapterError::RateLimited { retry_after_secs }) => {
                assert!(retry_after_secs >= 1);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn retry_after_reflects_refill_rate() {
        let bucket = TokenBucket::new(1, 0.5);
        bucket.try_acquire().unwrap();
        match bucket.try_acquire() {
            Err(AdapterError::RateLimited { retry_after_secs }) => {
                // One token at 0.5/s takes ~2s
                assert!(retry_after_secs >= 2);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }
}
