//! Process-wide counters of verification attempts and blocked attempts.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the abuse counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbuseTotals {
    pub attempts: u64,
    pub blocked: u64,
}

impl AbuseTotals {
    /// Fraction of attempts that were blocked, 0.0 with no attempts.
    pub fn rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.blocked as f64 / self.attempts as f64
        }
    }
}

/// Monotonic attempt/block counters, shared by every submission.
///
/// The two counters are independent; a reader may observe a block before the
/// attempt that caused it.
#[derive(Debug, Default)]
pub struct AbuseStats {
    attempts: AtomicU64,
    blocked: AtomicU64,
}

impl AbuseStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a submission that reached admission control.
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a submission rejected by rate limiting or cooldown.
    pub fn record_block(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn totals(&self) -> AbuseTotals {
        AbuseTotals {
            attempts: self.attempts.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
        }
    }

    /// `blocked / attempts`, 0.0 before any attempt.
    pub fn rate(&self) -> f64 {
        self.totals().rate()
    }
}
