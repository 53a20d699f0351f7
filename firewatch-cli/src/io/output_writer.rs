//! Output writer for replay artifacts.
//!
//! Writes three files to the output directory:
//! - outcomes.jsonl - one line per replayed event
//! - detections.geojson - the listing as a FeatureCollection
//! - metrics.json - the metrics report

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use firewatch_engine::{FeatureCollection, MetricsReport, SubmissionOutcome, VerifyError};
use firewatch_fs::{Filesystem, FsError};
use firewatch_schema::{AggregatedCounts, DetectionStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OUTCOMES_FILE: &str = "outcomes.jsonl";
pub const LISTING_FILE: &str = "detections.geojson";
pub const METRICS_FILE: &str = "metrics.json";

/// Errors from output writing.
#[derive(Debug, Error)]
pub enum OutputWriterError {
    #[error("failed to create output directory: {0}")]
    CreateDir(#[source] FsError),

    #[error("failed to write {file}: {source}")]
    Write {
        file: &'static str,
        #[source]
        source: FsError,
    },
}

/// Result of one replayed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub line: usize,
    pub at: DateTime<Utc>,
    pub detection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DetectionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<AggregatedCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl OutcomeRecord {
    pub fn accepted(line: usize, at: DateTime<Utc>, outcome: &SubmissionOutcome) -> Self {
        Self {
            line,
            at,
            detection_id: outcome.detection_id.clone(),
            status: Some(outcome.status),
            counts: Some(outcome.counts),
            error: None,
            code: None,
        }
    }

    pub fn rejected(line: usize, at: DateTime<Utc>, detection_id: &str, err: &VerifyError) -> Self {
        Self {
            line,
            at,
            detection_id: detection_id.to_string(),
            status: None,
            counts: None,
            error: Some(err.kind().to_string()),
            code: Some(err.status_code()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status.is_some()
    }
}

/// Paths of written artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub outcomes: PathBuf,
    pub listing: PathBuf,
    pub metrics: PathBuf,
}

/// Writes artifacts into one directory.
pub struct OutputWriter<'a, F: Filesystem> {
    fs: &'a F,
    out_dir: &'a Path,
}

impl<'a, F: Filesystem> OutputWriter<'a, F> {
    pub fn new(fs: &'a F, out_dir: &'a Path) -> Self {
        Self { fs, out_dir }
    }

    /// Write all artifacts.
    pub fn write_all(
        &self,
        outcomes: &[OutcomeRecord],
        listing: &FeatureCollection,
        metrics: &MetricsReport,
    ) -> Result<WrittenFiles, OutputWriterError> {
        self.fs
            .create_dir_all(self.out_dir)
            .map_err(OutputWriterError::CreateDir)?;

        Ok(WrittenFiles {
            outcomes: self.write(OUTCOMES_FILE, &render_outcomes(outcomes))?,
            listing: self.write(LISTING_FILE, &listing.to_json())?,
            metrics: self.write(METRICS_FILE, &metrics.to_json())?,
        })
    }

    fn write(&self, file: &'static str, content: &str) -> Result<PathBuf, OutputWriterError> {
        let path = self.out_dir.join(file);
        self.fs
            .write_atomic(&path, content.as_bytes())
            .map_err(|source| OutputWriterError::Write { file, source })?;
        Ok(path)
    }
}

/// One JSON object per line, newline-terminated.
pub fn render_outcomes(outcomes: &[OutcomeRecord]) -> String {
    let mut out = String::new();
    for record in outcomes {
        let line = serde_json::to_string(record).expect("OutcomeRecord serialization cannot fail");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use firewatch_engine::to_feature_collection;
    use firewatch_fs::MockFilesystem;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap()
    }

    fn records() -> Vec<OutcomeRecord> {
        let outcome = SubmissionOutcome {
            detection_id: "fire-1".to_string(),
            verification_id: 1,
            status: DetectionStatus::Accepted,
            counts: AggregatedCounts::new(1, 0, 0),
        };
        vec![
            OutcomeRecord::accepted(1, t0(), &outcome),
            OutcomeRecord::rejected(2, t0(), "fire-1", &VerifyError::Conflict),
        ]
    }

    #[test]
    fn test_render_outcomes_shapes() {
        let rendered = render_outcomes(&records());
        let lines: Vec<serde_json::Value> = rendered
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "accepted");
        assert_eq!(lines[0]["counts"]["confirms"], 1);
        assert!(lines[0].get("error").is_none());
        assert_eq!(lines[1]["error"], "conflict");
        assert_eq!(lines[1]["code"], 409);
        assert!(lines[1].get("status").is_none());
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn test_outcome_record_roundtrip() {
        let record = &records()[1];
        let json = serde_json::to_string(record).unwrap();
        let back: OutcomeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, record);
        assert!(!back.is_accepted());
    }

    #[test]
    fn test_write_all_creates_three_files() {
        let fs = MockFilesystem::new();
        let out = PathBuf::from("/out");
        let writer = OutputWriter::new(&fs, &out);

        let written = writer
            .write_all(&records(), &to_feature_collection(&[]), &MetricsReport::empty(24))
            .expect("write");

        assert_eq!(written.outcomes, PathBuf::from("/out/outcomes.jsonl"));
        assert_eq!(written.listing, PathBuf::from("/out/detections.geojson"));
        assert_eq!(written.metrics, PathBuf::from("/out/metrics.json"));
        assert!(fs.exists(&out));
        assert_eq!(fs.files().len(), 3);

        let metrics = String::from_utf8(fs.get_file(&written.metrics).unwrap()).unwrap();
        assert!(metrics.contains("\"window_hours\": 24"));
    }
}
