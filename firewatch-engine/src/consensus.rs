//! Consensus engine: aggregated verdict counts to detection status.

use firewatch_schema::{AggregatedCounts, DetectionStatus};

/// Thresholds for dismissing a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusPolicy {
    /// Denies needed before dismissal is considered.
    pub deny_threshold: u64,
    /// Also require denies to outnumber confirms.
    pub deny_must_exceed_confirm: bool,
}

impl ConsensusPolicy {
    pub fn new(deny_threshold: u64, deny_must_exceed_confirm: bool) -> Self {
        Self {
            deny_threshold,
            deny_must_exceed_confirm,
        }
    }
}

/// Evaluate counts against the policy.
///
/// First match wins:
/// - any confirm → `Accepted`
/// - `denies >= deny_threshold` (and `denies > confirms` when required) → `Dismissed`
/// - otherwise `Unconfirmed`
pub fn evaluate(counts: &AggregatedCounts, policy: &ConsensusPolicy) -> DetectionStatus {
    if counts.confirms >= 1 {
        return DetectionStatus::Accepted;
    }

    if counts.denies >= policy.deny_threshold && deny_majority_holds(counts, policy) {
        return DetectionStatus::Dismissed;
    }

    DetectionStatus::Unconfirmed
}

fn deny_majority_holds(counts: &AggregatedCounts, policy: &ConsensusPolicy) -> bool {
    !policy.deny_must_exceed_confirm || counts.denies > counts.confirms
}

/// The status to persist after a recount, or `None` when it is unchanged.
pub fn transition(
    current: DetectionStatus,
    counts: &AggregatedCounts,
    policy: &ConsensusPolicy,
) -> Option<DetectionStatus> {
    let next = evaluate(counts, policy);
    (next != current).then_some(next)
}
