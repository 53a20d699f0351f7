//! Storage contracts consumed by the verification service and metrics.
//!
//! Implementations must be safe to share across submission threads.
//! [`VerificationLedger::add`] is the authority on the one-verdict-per-device
//! rule: a racing second append for the same pair must fail with
//! [`LedgerError::Duplicate`] even if both callers passed
//! [`VerificationLedger::exists_for_device`].

use chrono::{DateTime, Utc};
use firewatch_schema::{
    AggregatedCounts, Detection, DetectionStatus, DeviceHash, NewVerification, Verification,
};

use crate::error::LedgerError;

/// Detections and their mutable status.
pub trait DetectionStore: Send + Sync {
    /// Add a detection. Fails if the id is taken.
    fn insert(&self, detection: Detection) -> Result<(), LedgerError>;

    fn get(&self, id: &str) -> Result<Option<Detection>, LedgerError>;

    /// Detections created at or after `since` with confidence at least
    /// `min_confidence`, newest first.
    fn list_since(
        &self,
        since: DateTime<Utc>,
        min_confidence: f64,
        include_dismissed: bool,
    ) -> Result<Vec<Detection>, LedgerError>;

    fn set_status(&self, id: &str, status: DetectionStatus) -> Result<(), LedgerError>;
}

/// Append-only verdict record.
pub trait VerificationLedger: Send + Sync {
    fn exists_for_device(
        &self,
        detection_id: &str,
        device_hash: &DeviceHash,
    ) -> Result<bool, LedgerError>;

    /// Append a verdict and return it with its assigned id.
    fn add(&self, verification: NewVerification) -> Result<Verification, LedgerError>;

    /// Per-verdict counts for one detection. Missing kinds are zero.
    fn counts(&self, detection_id: &str) -> Result<AggregatedCounts, LedgerError>;

    /// Verdicts across all detections created at or after `since`.
    fn count_total_in_window(&self, since: DateTime<Utc>) -> Result<u64, LedgerError>;

    /// Verdicts for one detection created in `[start, end]`.
    fn count_for_detection_between(
        &self,
        detection_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, LedgerError>;
}

impl<T: DetectionStore + ?Sized> DetectionStore for std::sync::Arc<T> {
    fn insert(&self, detection: Detection) -> Result<(), LedgerError> {
        (**self).insert(detection)
    }

    fn get(&self, id: &str) -> Result<Option<Detection>, LedgerError> {
        (**self).get(id)
    }

    fn list_since(
        &self,
        since: DateTime<Utc>,
        min_confidence: f64,
        include_dismissed: bool,
    ) -> Result<Vec<Detection>, LedgerError> {
        (**self).list_since(since, min_confidence, include_dismissed)
    }

    fn set_status(&self, id: &str, status: DetectionStatus) -> Result<(), LedgerError> {
        (**self).set_status(id, status)
    }
}

impl<T: VerificationLedger + ?Sized> VerificationLedger for std::sync::Arc<T> {
    fn exists_for_device(
        &self,
        detection_id: &str,
        device_hash: &DeviceHash,
    ) -> Result<bool, LedgerError> {
        (**self).exists_for_device(detection_id, device_hash)
    }

    fn add(&self, verification: NewVerification) -> Result<Verification, LedgerError> {
        (**self).add(verification)
    }

    fn counts(&self, detection_id: &str) -> Result<AggregatedCounts, LedgerError> {
        (**self).counts(detection_id)
    }

    fn count_total_in_window(&self, since: DateTime<Utc>) -> Result<u64, LedgerError> {
        (**self).count_total_in_window(since)
    }

    fn count_for_detection_between(
        &self,
        detection_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        (**self).count_for_detection_between(detection_id, start, end)
    }
}
