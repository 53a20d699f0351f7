//! Firewatch anti-abuse guards
//!
//! Admission control for anonymous verification submissions:
//! - Fingerprinter: hashed device identifier from request signals
//! - RateLimiter: per-IP token bucket
//! - CooldownGuard: per-device minimum interval
//! - AbuseStats: attempt/block counters
//!
//! Guards take the current time as an argument and never touch storage.

pub mod abuse;
pub mod cooldown;
pub mod fingerprint;
pub mod rate_limit;

pub use abuse::{AbuseStats, AbuseTotals};
pub use cooldown::{CooldownActive, CooldownGuard};
pub use fingerprint::{hash_ip, sha256_hex, Fingerprint, RequestOrigin, CLIENT_TOKEN_COOKIE};
pub use rate_limit::{RateLimiter, TokenBucket, DEFAULT_MAX_TRACKED_KEYS};
