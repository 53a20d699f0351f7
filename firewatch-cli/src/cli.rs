//! CLI argument parsing for the `firewatch` binary.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use firewatch_engine::EngineConfig;
use thiserror::Error;

/// Default lookback for the listing and metrics.
pub const DEFAULT_WINDOW_HOURS: u32 = 24;

/// Default confidence floor for the listing.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.0;

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    #[error("window-hours must be at least 1, got {0}")]
    InvalidWindowHours(u32),

    #[error("min-confidence must be within 0.0..=1.0, got {0}")]
    InvalidMinConfidence(f64),

    #[error("rate-limit-per-minute must be at least 1, got {0}")]
    InvalidRateLimit(u32),

    #[error("deny-threshold must be at least 1, got {0}")]
    InvalidDenyThreshold(u64),
}

/// Firewatch - crowd verification engine for wildfire detections.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "firewatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Replay recorded submissions and write outcomes, listing and metrics.
    Replay(ReplayArgs),
}

/// Arguments for the replay command.
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ReplayArgs {
    /// JSON Lines file with one detection per line.
    #[arg(long)]
    pub detections: PathBuf,

    /// JSON Lines file with one submission event per line.
    #[arg(long)]
    pub events: PathBuf,

    /// Output directory for outcomes.jsonl, detections.geojson and metrics.json.
    #[arg(long = "out-dir")]
    pub out_dir: PathBuf,

    /// Lookback window in hours for the listing and metrics.
    #[arg(long, default_value_t = DEFAULT_WINDOW_HOURS)]
    pub window_hours: u32,

    /// Minimum detection confidence for the listing (inclusive).
    #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    pub min_confidence: f64,

    /// Override permits per client IP per minute.
    #[arg(long)]
    pub rate_limit_per_minute: Option<u32>,

    /// Override seconds between submissions from one device.
    #[arg(long)]
    pub cooldown_seconds: Option<u64>,

    /// Override denies needed to dismiss a detection.
    #[arg(long)]
    pub deny_threshold: Option<u64>,

    /// Dismiss at the deny threshold even when denies do not outnumber confirms.
    #[arg(long)]
    pub allow_deny_without_majority: bool,

    /// Ignore submitted photos.
    #[arg(long)]
    pub no_photos: bool,

    /// Override the directory photos are written to.
    #[arg(long)]
    pub photos_dir: Option<PathBuf>,

    /// Evaluate the listing and metrics at this RFC 3339 time instead of the last event.
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,

    /// Increase log output (-v rejections, -vv every verdict).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl ReplayArgs {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.window_hours == 0 {
            return Err(CliError::InvalidWindowHours(self.window_hours));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(CliError::InvalidMinConfidence(self.min_confidence));
        }
        if self.rate_limit_per_minute == Some(0) {
            return Err(CliError::InvalidRateLimit(0));
        }
        if self.deny_threshold == Some(0) {
            return Err(CliError::InvalidDenyThreshold(0));
        }
        Ok(())
    }

    /// Layer flag overrides on top of `base`.
    pub fn apply_overrides(&self, base: EngineConfig) -> EngineConfig {
        let mut config = base;
        if let Some(per_minute) = self.rate_limit_per_minute {
            config = config.with_rate_limit_per_minute(per_minute);
        }
        if let Some(seconds) = self.cooldown_seconds {
            config = config.with_cooldown_seconds(seconds);
        }
        if let Some(threshold) = self.deny_threshold {
            config = config.with_dismiss_deny_threshold(threshold);
        }
        if self.allow_deny_without_majority {
            config = config.with_deny_must_exceed_confirm(false);
        }
        if self.no_photos {
            config = config.with_save_photos(false);
        }
        if let Some(dir) = &self.photos_dir {
            config = config.with_photos_dir(dir.clone());
        }
        config
    }
}

/// Parse CLI arguments from an iterator of strings.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}
