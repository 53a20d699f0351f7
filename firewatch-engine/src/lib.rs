//! Firewatch verification engine
//!
//! Turns anonymous crowd verdicts into detection status:
//! - `service`: the submission pipeline over the guards and the store
//! - `consensus`: pure status decision from aggregated counts
//! - `ledger` / `memory`: storage contracts and an in-process store
//! - `listing` / `metrics`: read-side queries
//! - `photo`: photo evidence contract and storage

pub mod config;
pub mod consensus;
pub mod error;
pub mod ledger;
pub mod listing;
pub mod logger;
pub mod memory;
pub mod metrics;
pub mod photo;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use consensus::{evaluate, ConsensusPolicy};
pub use error::{LedgerError, VerifyError};
pub use ledger::{DetectionStore, VerificationLedger};
pub use listing::{list_detections, to_feature_collection, DetectionWithCounts, FeatureCollection};
pub use logger::{Logger, MockLogger, NullLogger, StderrLogger, Verbosity};
pub use memory::MemoryStore;
pub use metrics::{MetricsAggregator, MetricsReport, MetricsTotals};
pub use photo::{FsPhotoStore, NoPhotoStore, PhotoError, PhotoKind, PhotoStore, PhotoUpload};
pub use service::{SubmissionOutcome, SubmissionRequest, VerificationService};
