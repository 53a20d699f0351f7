//! Detection record and its status state machine values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// Default source label for detections without one.
pub const DEFAULT_SOURCE: &str = "seed";

/// Default fire-weather-index bucket.
pub const DEFAULT_FWI_BUCKET: u8 = 2;

/// Highest fire-weather-index bucket.
pub const MAX_FWI_BUCKET: u8 = 5;

/// Trust status of a detection.
///
/// Starts `Unconfirmed`. `Accepted` never reverts; `Dismissed` closes the
/// detection to further verdicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStatus {
    #[default]
    Unconfirmed,
    Accepted,
    Dismissed,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Unconfirmed => "unconfirmed",
            DetectionStatus::Accepted => "accepted",
            DetectionStatus::Dismissed => "dismissed",
        }
    }

    /// Whether new verdicts may still be recorded.
    pub fn accepts_verdicts(&self) -> bool {
        !matches!(self, DetectionStatus::Dismissed)
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unconfirmed" => Ok(DetectionStatus::Unconfirmed),
            "accepted" => Ok(DetectionStatus::Accepted),
            "dismissed" => Ok(DetectionStatus::Dismissed),
            _ => Err(ParseEnumError::new("detection status", s)),
        }
    }
}

/// A candidate wildfire sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub created_at: DateTime<Utc>,
    /// Detector confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    #[serde(default = "default_source")]
    pub source: String,
    /// Fire-weather-index bucket, `0..=5`.
    #[serde(default = "default_fwi_bucket")]
    pub fwi_bucket: u8,
    /// Wind direction in degrees, `0..360`.
    #[serde(default)]
    pub wind_dir_deg: u16,
    #[serde(default)]
    pub status: DetectionStatus,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_fwi_bucket() -> u8 {
    DEFAULT_FWI_BUCKET
}

impl Detection {
    /// Create an unconfirmed detection with default source and weather fields.
    pub fn new(
        id: impl Into<String>,
        lat: f64,
        lon: f64,
        created_at: DateTime<Utc>,
        confidence: f64,
    ) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            created_at,
            confidence,
            source: default_source(),
            fwi_bucket: DEFAULT_FWI_BUCKET,
            wind_dir_deg: 0,
            status: DetectionStatus::Unconfirmed,
        }
    }

    /// Builder: set source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Builder: set fire-weather-index bucket.
    pub fn with_fwi_bucket(mut self, bucket: u8) -> Self {
        self.fwi_bucket = bucket;
        self
    }

    /// Builder: set wind direction.
    pub fn with_wind_dir_deg(mut self, deg: u16) -> Self {
        self.wind_dir_deg = deg;
        self
    }

    /// Builder: set status.
    pub fn with_status(mut self, status: DetectionStatus) -> Self {
        self.status = status;
        self
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.id.trim().is_empty() {
            return Err(DetectionError::EmptyId);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectionError::Confidence(self.confidence));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(DetectionError::Coordinates {
                lat: self.lat,
                lon: self.lon,
            });
        }
        if self.fwi_bucket > MAX_FWI_BUCKET {
            return Err(DetectionError::FwiBucket(self.fwi_bucket));
        }
        if self.wind_dir_deg >= 360 {
            return Err(DetectionError::WindDirection(self.wind_dir_deg));
        }
        Ok(())
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Detection serialization cannot fail")
    }

    /// Deserialize from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self, DetectionError> {
        let detection: Detection = serde_json::from_str(json)?;
        detection.validate()?;
        Ok(detection)
    }
}

/// Errors from detection parsing and validation.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("detection id must not be empty")]
    EmptyId,

    #[error("confidence must be within 0.0..=1.0, got {0}")]
    Confidence(f64),

    #[error("coordinates out of range: lat {lat}, lon {lon}")]
    Coordinates { lat: f64, lon: f64 },

    #[error("fwi bucket must be at most 5, got {0}")]
    FwiBucket(u8),

    #[error("wind direction must be below 360 degrees, got {0}")]
    WindDirection(u16),
}
