//! Error taxonomy for verification submissions and the storage contracts.

use firewatch_guard::CooldownActive;
use thiserror::Error;

use crate::photo::PhotoError;

/// Failures from the detection store or verification ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("device {device_hash} already voted on detection {detection_id}")]
    Duplicate {
        detection_id: String,
        device_hash: String,
    },

    #[error("detection {0} already exists")]
    DuplicateDetection(String),

    #[error("unknown detection {0}")]
    UnknownDetection(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why a verification submission was rejected.
///
/// Everything except `Storage` is an expected, local outcome.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("detection not found")]
    NotFound,

    #[error("detection has been dismissed")]
    Gone,

    #[error("this device already verified the detection")]
    Conflict,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("cooldown active, retry in {retry_after_secs}s")]
    CooldownActive { retry_after_secs: u64 },

    #[error("invalid photo: {0}")]
    InvalidPhoto(#[from] PhotoError),

    #[error("storage failure: {0}")]
    Storage(#[source] LedgerError),
}

impl VerifyError {
    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            VerifyError::NotFound => 404,
            VerifyError::Gone => 410,
            VerifyError::Conflict => 409,
            VerifyError::RateLimited | VerifyError::CooldownActive { .. } => 429,
            VerifyError::InvalidPhoto(_) => 400,
            VerifyError::Storage(_) => 500,
        }
    }

    /// Whether the same request may succeed later without changes.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            VerifyError::RateLimited | VerifyError::CooldownActive { .. }
        )
    }

    /// Rejections raised by the admission-control guards.
    pub fn is_abuse_block(&self) -> bool {
        self.is_retriable()
    }

    /// Stable snake_case label.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::NotFound => "not_found",
            VerifyError::Gone => "gone",
            VerifyError::Conflict => "conflict",
            VerifyError::RateLimited => "rate_limited",
            VerifyError::CooldownActive { .. } => "cooldown_active",
            VerifyError::InvalidPhoto(_) => "invalid_photo",
            VerifyError::Storage(_) => "storage",
        }
    }
}

impl From<CooldownActive> for VerifyError {
    fn from(err: CooldownActive) -> Self {
        VerifyError::CooldownActive {
            retry_after_secs: err.retry_after_secs,
        }
    }
}

impl From<LedgerError> for VerifyError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Duplicate { .. } => VerifyError::Conflict,
            LedgerError::UnknownDetection(_) => VerifyError::NotFound,
            other => VerifyError::Storage(other),
        }
    }
}
