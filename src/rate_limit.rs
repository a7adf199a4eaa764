use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::configuration::{RateLimitSettings, RateLimitStrategy};

/// Paces the dispatch pipeline between two sends.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Resolves once the next send may go out.
    async fn wait(&self);
}

pub fn from_settings(settings: &RateLimitSettings) -> Box<dyn RateLimiter> {
    match settings.strategy {
        RateLimitStrategy::FixedDelay => Box::new(FixedDelay::new(settings.delay())),
        RateLimitStrategy::TokenBucket => {
            Box::new(TokenBucket::new(settings.burst.max(1), settings.delay()))
        }
    }
}

/// Pauses for the same amount of time after every send.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RateLimiter for FixedDelay {
    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

/// Lets up to `capacity` sends through back to back, then one more per
/// `refill_every`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_every: Duration,
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_every: Duration) -> Self {
        Self {
            capacity,
            refill_every,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        if self.refill_every.is_zero() {
            bucket.tokens = self.capacity;
            bucket.last_refill = now;
            return;
        }

        let elapsed = now.duration_since(bucket.last_refill);
        let earned = (elapsed.as_nanos() / self.refill_every.as_nanos()) as u64;
        if earned == 0 {
            return;
        }

        let tokens = u64::from(bucket.tokens) + earned;
        if tokens >= u64::from(self.capacity) {
            bucket.tokens = self.capacity;
            bucket.last_refill = now;
        } else {
            bucket.tokens = tokens as u32;
            bucket.last_refill += self.refill_every * earned as u32;
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn wait(&self) {
        loop {
            let pause = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                self.refill(&mut bucket, now);
                if bucket.tokens > 0 {
                    bucket.tokens -= 1;
                    return;
                }
                self.refill_every - now.duration_since(bucket.last_refill)
            };
            tokio::time::sleep(pause).await;
        }
    }
}
