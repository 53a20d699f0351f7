//! Firewatch data model
//!
//! Detections, crowd verdicts, and the aggregates derived from them.

mod detection;
mod verification;

pub use detection::{
    Detection, DetectionError, DetectionStatus, DEFAULT_FWI_BUCKET, DEFAULT_SOURCE, MAX_FWI_BUCKET,
};
pub use verification::{AggregatedCounts, DeviceHash, NewVerification, Verdict, Verification};

/// Error for an unrecognised enum name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
