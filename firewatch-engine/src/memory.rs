//! In-process store implementing both storage contracts.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use firewatch_schema::{
    AggregatedCounts, Detection, DetectionStatus, DeviceHash, NewVerification, Verification,
};
use parking_lot::Mutex;

use crate::error::LedgerError;
use crate::ledger::{DetectionStore, VerificationLedger};

#[derive(Debug, Default)]
struct Tables {
    detections: HashMap<String, Detection>,
    verifications: Vec<Verification>,
    voted: HashSet<(String, DeviceHash)>,
    next_id: u64,
}

/// Detections and verdicts held in memory behind a single lock.
///
/// The uniqueness check and the append in [`VerificationLedger::add`] run
/// under the same guard, so concurrent duplicates collapse to one record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored verdict in append order.
    pub fn verifications(&self) -> Vec<Verification> {
        self.tables.lock().verifications.clone()
    }

    pub fn detection_count(&self) -> usize {
        self.tables.lock().detections.len()
    }
}

impl DetectionStore for MemoryStore {
    fn insert(&self, detection: Detection) -> Result<(), LedgerError> {
        let mut tables = self.tables.lock();
        if tables.detections.contains_key(&detection.id) {
            return Err(LedgerError::DuplicateDetection(detection.id));
        }
        tables.detections.insert(detection.id.clone(), detection);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Detection>, LedgerError> {
        Ok(self.tables.lock().detections.get(id).cloned())
    }

    fn list_since(
        &self,
        since: DateTime<Utc>,
        min_confidence: f64,
        include_dismissed: bool,
    ) -> Result<Vec<Detection>, LedgerError> {
        let tables = self.tables.lock();
        let mut found: Vec<Detection> = tables
            .detections
            .values()
            .filter(|d| d.created_at >= since)
            .filter(|d| d.confidence >= min_confidence)
            .filter(|d| include_dismissed || d.status != DetectionStatus::Dismissed)
            .cloned()
            .collect();
        drop(tables);

        found.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(found)
    }

    fn set_status(&self, id: &str, status: DetectionStatus) -> Result<(), LedgerError> {
        let mut tables = self.tables.lock();
        match tables.detections.get_mut(id) {
            Some(detection) => {
                detection.status = status;
                Ok(())
            }
            None => Err(LedgerError::UnknownDetection(id.to_string())),
        }
    }
}

impl VerificationLedger for MemoryStore {
    fn exists_for_device(
        &self,
        detection_id: &str,
        device_hash: &DeviceHash,
    ) -> Result<bool, LedgerError> {
        let tables = self.tables.lock();
        Ok(tables
            .voted
            .contains(&(detection_id.to_string(), device_hash.clone())))
    }

    fn add(&self, verification: NewVerification) -> Result<Verification, LedgerError> {
        let mut tables = self.tables.lock();

        if !tables.detections.contains_key(&verification.detection_id) {
            return Err(LedgerError::UnknownDetection(verification.detection_id));
        }

        let key = (
            verification.detection_id.clone(),
            verification.device_hash.clone(),
        );
        if tables.voted.contains(&key) {
            return Err(LedgerError::Duplicate {
                detection_id: key.0,
                device_hash: key.1.to_string(),
            });
        }

        tables.next_id += 1;
        let stored = verification.into_stored(tables.next_id);
        tables.voted.insert(key);
        tables.verifications.push(stored.clone());
        Ok(stored)
    }

    fn counts(&self, detection_id: &str) -> Result<AggregatedCounts, LedgerError> {
        let tables = self.tables.lock();
        Ok(tables
            .verifications
            .iter()
            .filter(|v| v.detection_id == detection_id)
            .map(|v| &v.verdict)
            .collect())
    }

    fn count_total_in_window(&self, since: DateTime<Utc>) -> Result<u64, LedgerError> {
        let tables = self.tables.lock();
        Ok(tables
            .verifications
            .iter()
            .filter(|v| v.created_at >= since)
            .count() as u64)
    }

    fn count_for_detection_between(
        &self,
        detection_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        let tables = self.tables.lock();
        Ok(tables
            .verifications
            .iter()
            .filter(|v| v.detection_id == detection_id)
            .filter(|v| v.created_at >= start && v.created_at <= end)
            .count() as u64)
    }
}
