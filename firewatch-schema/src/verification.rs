//! Crowd verdicts and their aggregates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// One submitter's opinion on a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Confirm,
    Deny,
    Unsure,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Confirm => "confirm",
            Verdict::Deny => "deny",
            Verdict::Unsure => "unsure",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirm" => Ok(Verdict::Confirm),
            "deny" => Ok(Verdict::Deny),
            "unsure" => Ok(Verdict::Unsure),
            _ => Err(ParseEnumError::new("verdict", s)),
        }
    }
}

/// Hashed device fingerprint, rendered as lowercase hex.
///
/// Never holds raw fingerprint material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceHash(String);

impl DeviceHash {
    /// Wrap an already-hashed hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for DeviceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A verdict that has not been appended to the ledger yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVerification {
    pub detection_id: String,
    pub created_at: DateTime<Utc>,
    pub verdict: Verdict,
    pub device_hash: DeviceHash,
    pub ip_hash: String,
    pub photo_path: Option<String>,
}

impl NewVerification {
    /// Attach the ledger-assigned identifier.
    pub fn into_stored(self, id: u64) -> Verification {
        Verification {
            id,
            detection_id: self.detection_id,
            created_at: self.created_at,
            verdict: self.verdict,
            device_hash: self.device_hash,
            ip_hash: self.ip_hash,
            photo_path: self.photo_path,
        }
    }
}

/// A stored crowd verdict. Created once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub id: u64,
    pub detection_id: String,
    pub created_at: DateTime<Utc>,
    pub verdict: Verdict,
    pub device_hash: DeviceHash,
    pub ip_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
}

/// Per-verdict counts for one detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedCounts {
    pub confirms: u64,
    pub denies: u64,
    pub unsure: u64,
}

impl AggregatedCounts {
    pub fn new(confirms: u64, denies: u64, unsure: u64) -> Self {
        Self {
            confirms,
            denies,
            unsure,
        }
    }

    /// Count one more verdict.
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Confirm => self.confirms += 1,
            Verdict::Deny => self.denies += 1,
            Verdict::Unsure => self.unsure += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.confirms + self.denies + self.unsure
    }
}

impl<'a> FromIterator<&'a Verdict> for AggregatedCounts {
    fn from_iter<I: IntoIterator<Item = &'a Verdict>>(iter: I) -> Self {
        let mut counts = AggregatedCounts::default();
        for verdict in iter {
            counts.record(*verdict);
        }
        counts
    }
}
