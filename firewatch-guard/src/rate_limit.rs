//! Per-origin token-bucket admission control.
//!
//! Each key (client IP) owns a bucket holding up to `capacity` tokens that
//! refills continuously at `capacity / 60` tokens per second. A check takes one
//! token or rejects. Buckets are refilled lazily on access; there is no
//! background task.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Refill window in seconds (capacity tokens per minute).
pub const REFILL_WINDOW_SECS: f64 = 60.0;

/// Default soft bound on tracked keys before stale entries are swept.
pub const DEFAULT_MAX_TRACKED_KEYS: usize = 100_000;

/// Token bucket state for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn full(capacity: u32, now: DateTime<Utc>) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_per_sec: capacity / REFILL_WINDOW_SECS,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Add tokens for the time elapsed since the last refill.
    ///
    /// Negative elapsed time (clock moved backwards) adds nothing.
    pub fn refill(&mut self, now: DateTime<Utc>) {
        let elapsed = elapsed_secs(self.last_refill, now);
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Refill, then take one token if available.
    pub fn try_take(&mut self, now: DateTime<Utc>) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whether the bucket would be full at `now` without being touched.
    ///
    /// A full bucket is indistinguishable from a fresh one.
    pub fn is_full_at(&self, now: DateTime<Utc>) -> bool {
        let elapsed = elapsed_secs(self.last_refill, now);
        self.tokens + elapsed * self.refill_per_sec >= self.capacity
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let micros = (to - from).num_microseconds().unwrap_or(i64::MAX);
    (micros.max(0) as f64) / 1_000_000.0
}

/// Token-bucket rate limiter keyed by origin.
///
/// One lock guards the whole map, so refill, compare and decrement for a key
/// happen as a unit.
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: u32,
    max_tracked_keys: usize,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    /// Create a limiter admitting `per_minute` requests per key per minute.
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Builder: set the soft bound on tracked keys.
    pub fn with_max_tracked_keys(mut self, max: usize) -> Self {
        self.max_tracked_keys = max;
        self
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Admit or reject one request from `key` at `now`.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut buckets = self.buckets.lock();

        if let Some(bucket) = buckets.get_mut(key) {
            return bucket.try_take(now);
        }

        if buckets.len() >= self.max_tracked_keys {
            buckets.retain(|_, b| !b.is_full_at(now));
        }

        let mut bucket = TokenBucket::full(self.per_minute, now);
        let admitted = bucket.try_take(now);
        buckets.insert(key.to_string(), bucket);
        admitted
    }

    /// Drop buckets that have refilled completely. Returns how many were dropped.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, b| !b.is_full_at(now));
        before - buckets.len()
    }

    /// Number of keys currently holding a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Current token level for a key, if tracked (without refilling).
    pub fn tokens_for(&self, key: &str) -> Option<f64> {
        self.buckets.lock().get(key).map(TokenBucket::tokens)
    }
}
