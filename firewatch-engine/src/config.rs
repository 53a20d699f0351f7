//! Engine configuration.
//!
//! Defaults match the production deployment. Values can be read from
//! `HF_*` environment variables and then overridden field by field.

use std::path::PathBuf;

use crate::consensus::ConsensusPolicy;

/// Default permits per client IP per minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;

/// Default minimum seconds between submissions from one device.
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 30;

/// Default number of denies that can dismiss a detection.
pub const DEFAULT_DISMISS_DENY_THRESHOLD: u64 = 2;

/// Default for requiring denies to outnumber confirms before dismissal.
pub const DEFAULT_DENY_MUST_EXCEED_CONFIRM: bool = true;

/// Default for keeping submitted photos.
pub const DEFAULT_SAVE_PHOTOS: bool = true;

/// Default photo directory.
pub const DEFAULT_PHOTOS_DIR: &str = "./var/photos";

/// Default soft bound on keys tracked by each anti-abuse map.
pub const DEFAULT_MAX_TRACKED_KEYS: usize = firewatch_guard::DEFAULT_MAX_TRACKED_KEYS;

pub const ENV_RATE_LIMIT_PER_MINUTE: &str = "HF_RATE_LIMIT_PER_MINUTE";
pub const ENV_VERIFY_COOLDOWN_SECONDS: &str = "HF_VERIFY_COOLDOWN_SECONDS";
pub const ENV_DISMISS_DENY_THRESHOLD: &str = "HF_DISMISS_DENY_THRESHOLD";
pub const ENV_DISMISS_DENY_OVER_CONFIRM: &str = "HF_DISMISS_DENY_OVER_CONFIRM";
pub const ENV_SAVE_PHOTOS: &str = "HF_SAVE_PHOTOS";
pub const ENV_PHOTOS_DIR: &str = "HF_PHOTOS_DIR";
pub const ENV_MAX_TRACKED_KEYS: &str = "HF_MAX_TRACKED_KEYS";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub rate_limit_per_minute: u32,
    pub cooldown_seconds: u64,
    pub dismiss_deny_threshold: u64,
    pub deny_must_exceed_confirm: bool,
    pub save_photos: bool,
    pub photos_dir: PathBuf,
    pub max_tracked_keys: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            dismiss_deny_threshold: DEFAULT_DISMISS_DENY_THRESHOLD,
            deny_must_exceed_confirm: DEFAULT_DENY_MUST_EXCEED_CONFIRM,
            save_photos: DEFAULT_SAVE_PHOTOS,
            photos_dir: PathBuf::from(DEFAULT_PHOTOS_DIR),
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through a lookup function.
    ///
    /// Unset or empty values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get(ENV_RATE_LIMIT_PER_MINUTE) {
            config.rate_limit_per_minute = parse_number(ENV_RATE_LIMIT_PER_MINUTE, &v)?;
        }
        if let Some(v) = get(ENV_VERIFY_COOLDOWN_SECONDS) {
            config.cooldown_seconds = parse_number(ENV_VERIFY_COOLDOWN_SECONDS, &v)?;
        }
        if let Some(v) = get(ENV_DISMISS_DENY_THRESHOLD) {
            config.dismiss_deny_threshold = parse_number(ENV_DISMISS_DENY_THRESHOLD, &v)?;
        }
        if let Some(v) = get(ENV_DISMISS_DENY_OVER_CONFIRM) {
            config.deny_must_exceed_confirm = parse_flag(&v);
        }
        if let Some(v) = get(ENV_SAVE_PHOTOS) {
            config.save_photos = parse_flag(&v);
        }
        if let Some(v) = get(ENV_PHOTOS_DIR) {
            config.photos_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_MAX_TRACKED_KEYS) {
            config.max_tracked_keys = parse_number(ENV_MAX_TRACKED_KEYS, &v)?;
        }

        Ok(config)
    }

    /// Builder: set rate_limit_per_minute.
    pub fn with_rate_limit_per_minute(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Builder: set cooldown_seconds.
    pub fn with_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    /// Builder: set dismiss_deny_threshold.
    pub fn with_dismiss_deny_threshold(mut self, threshold: u64) -> Self {
        self.dismiss_deny_threshold = threshold;
        self
    }

    /// Builder: set deny_must_exceed_confirm.
    pub fn with_deny_must_exceed_confirm(mut self, enabled: bool) -> Self {
        self.deny_must_exceed_confirm = enabled;
        self
    }

    /// Builder: set save_photos.
    pub fn with_save_photos(mut self, enabled: bool) -> Self {
        self.save_photos = enabled;
        self
    }

    /// Builder: set photos_dir.
    pub fn with_photos_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.photos_dir = dir.into();
        self
    }

    /// Builder: set max_tracked_keys.
    pub fn with_max_tracked_keys(mut self, max: usize) -> Self {
        self.max_tracked_keys = max;
        self
    }

    /// Consensus thresholds as a standalone policy.
    pub fn consensus_policy(&self) -> ConsensusPolicy {
        ConsensusPolicy::new(self.dismiss_deny_threshold, self.deny_must_exceed_confirm)
    }

    /// Reject values that would disable a guard by accident.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_per_minute == 0 {
            return Err(ConfigError::OutOfRange {
                name: "rate_limit_per_minute",
                reason: "must be at least 1",
            });
        }
        if self.dismiss_deny_threshold == 0 {
            return Err(ConfigError::OutOfRange {
                name: "dismiss_deny_threshold",
                reason: "must be at least 1",
            });
        }
        if self.max_tracked_keys == 0 {
            return Err(ConfigError::OutOfRange {
                name: "max_tracked_keys",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

/// `1`, `true`, `yes`, `y` (any case) are true; everything else is false.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

/// Errors from configuration loading and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{name} {reason}")]
    OutOfRange {
        name: &'static str,
        reason: &'static str,
    },
}
