//! Per-device minimum interval between verification submissions.
//!
//! The stamp is written when a device is admitted, before any later check
//! runs, so an admitted submission that then fails still starts a new window.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use firewatch_schema::DeviceHash;
use parking_lot::Mutex;
use thiserror::Error;

use crate::rate_limit::DEFAULT_MAX_TRACKED_KEYS;

/// Rejection carrying how long the device still has to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cooldown active, retry in {retry_after_secs}s")]
pub struct CooldownActive {
    pub retry_after_secs: u64,
}

/// Minimum-interval gate keyed by hashed device fingerprint.
#[derive(Debug)]
pub struct CooldownGuard {
    cooldown: Duration,
    max_tracked_keys: usize,
    last_admitted: Mutex<HashMap<DeviceHash, DateTime<Utc>>>,
}

impl CooldownGuard {
    pub fn new(cooldown_seconds: u64) -> Self {
        // u32::MAX seconds is well past any sane window and fits TimeDelta
        let secs = cooldown_seconds.min(u64::from(u32::MAX)) as i64;
        Self {
            cooldown: Duration::seconds(secs),
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
            last_admitted: Mutex::new(HashMap::new()),
        }
    }

    /// Builder: set the soft bound on tracked devices.
    pub fn with_max_tracked_keys(mut self, max: usize) -> Self {
        self.max_tracked_keys = max;
        self
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Admit the device and stamp `now`, or reject without touching the stamp.
    pub fn enforce(&self, device: &DeviceHash, now: DateTime<Utc>) -> Result<(), CooldownActive> {
        let mut last_admitted = self.last_admitted.lock();

        if let Some(&last) = last_admitted.get(device) {
            let elapsed = now - last;
            if elapsed < self.cooldown {
                return Err(CooldownActive {
                    retry_after_secs: ceil_secs(self.cooldown - elapsed),
                });
            }
        } else if last_admitted.len() >= self.max_tracked_keys {
            let cooldown = self.cooldown;
            last_admitted.retain(|_, last| now - *last < cooldown);
        }

        last_admitted.insert(device.clone(), now);
        Ok(())
    }

    /// Drop stamps whose window has passed. Returns how many were dropped.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut last_admitted = self.last_admitted.lock();
        let before = last_admitted.len();
        let cooldown = self.cooldown;
        last_admitted.retain(|_, last| now - *last < cooldown);
        before - last_admitted.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_admitted.lock().len()
    }

    /// When the device was last admitted, if tracked.
    pub fn last_admitted(&self, device: &DeviceHash) -> Option<DateTime<Utc>> {
        self.last_admitted.lock().get(device).copied()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let millis = d.num_milliseconds().max(0);
    u64::try_from((millis + 999) / 1_000).unwrap_or(0)
}
