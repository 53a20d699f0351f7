//! Rolling health metrics over a lookback window.

use chrono::{DateTime, Duration, Utc};
use firewatch_guard::AbuseStats;
use firewatch_schema::DetectionStatus;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::{DetectionStore, VerificationLedger};

/// Verdicts a detection needs within the corroboration window.
pub const NORTH_STAR_MIN_VERIFICATIONS: u64 = 3;

/// Minutes after creation that count toward corroboration.
pub const NORTH_STAR_WINDOW_MINUTES: i64 = 30;

/// Counts behind the rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsTotals {
    pub detections: u64,
    pub dismissed: u64,
    pub accepted: u64,
    pub verifications: u64,
}

/// Window-scoped health report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub window_hours: u32,
    /// Percent of detections with at least three verdicts in their first 30 minutes.
    pub north_star_pct: f64,
    pub false_alarm_rate: f64,
    /// Process-wide, not window-scoped.
    pub abuse_block_rate: f64,
    pub totals: MetricsTotals,
}

impl MetricsReport {
    /// All-zero report for a window with no detections.
    pub fn empty(window_hours: u32) -> Self {
        Self {
            window_hours,
            north_star_pct: 0.0,
            false_alarm_rate: 0.0,
            abuse_block_rate: 0.0,
            totals: MetricsTotals::default(),
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("MetricsReport serialization cannot fail")
    }
}

/// Reads detections, the ledger and abuse counters to build a [`MetricsReport`].
pub struct MetricsAggregator<'a, S: ?Sized> {
    store: &'a S,
    abuse: &'a AbuseStats,
}

impl<'a, S> MetricsAggregator<'a, S>
where
    S: DetectionStore + VerificationLedger + ?Sized,
{
    pub fn new(store: &'a S, abuse: &'a AbuseStats) -> Self {
        Self { store, abuse }
    }

    /// Compute the report for the `window_hours` ending at `now`.
    pub fn compute(&self, now: DateTime<Utc>, window_hours: u32) -> Result<MetricsReport, LedgerError> {
        let since = now - Duration::hours(i64::from(window_hours));
        let detections = self.store.list_since(since, 0.0, true)?;

        if detections.is_empty() {
            return Ok(MetricsReport::empty(window_hours));
        }

        let total = detections.len() as u64;
        let mut dismissed = 0u64;
        let mut accepted = 0u64;
        let mut corroborated = 0u64;

        for d in &detections {
            match d.status {
                DetectionStatus::Dismissed => dismissed += 1,
                DetectionStatus::Accepted => accepted += 1,
                DetectionStatus::Unconfirmed => {}
            }

            let end = d.created_at + Duration::minutes(NORTH_STAR_WINDOW_MINUTES);
            let early = self
                .store
                .count_for_detection_between(&d.id, d.created_at, end)?;
            if early >= NORTH_STAR_MIN_VERIFICATIONS {
                corroborated += 1;
            }
        }

        Ok(MetricsReport {
            window_hours,
            north_star_pct: 100.0 * corroborated as f64 / total as f64,
            false_alarm_rate: dismissed as f64 / total as f64,
            abuse_block_rate: self.abuse.rate(),
            totals: MetricsTotals {
                detections: total,
                dismissed,
                accepted,
                verifications: self.store.count_total_in_window(since)?,
            },
        })
    }
}
