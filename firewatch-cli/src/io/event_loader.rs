//! JSON Lines loaders for detections and recorded submissions.
//!
//! Format:
//! - One JSON object per line
//! - Lines starting with # are comments
//! - Empty lines are ignored

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use firewatch_fs::{Filesystem, FsError};
use firewatch_guard::RequestOrigin;
use firewatch_schema::{Detection, DetectionError, Verdict};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading input files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: FsError,
    },

    #[error("invalid detection on line {line}: {source}")]
    Detection {
        line: usize,
        #[source]
        source: DetectionError,
    },

    #[error("invalid event on line {line}: {source}")]
    Event {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read photo for event on line {line}: {source}")]
    Photo {
        line: usize,
        #[source]
        source: FsError,
    },
}

/// Photo attached to a recorded submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    /// Relative paths resolve against the events file's directory.
    pub path: PathBuf,
    pub content_type: String,
}

/// One recorded verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEvent {
    pub at: DateTime<Utc>,
    pub detection_id: String,
    pub verdict: Verdict,
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub client_token: Option<String>,
    #[serde(default)]
    pub photo: Option<PhotoRef>,
}

impl SubmissionEvent {
    /// Request signals for fingerprinting and rate limiting.
    pub fn origin(&self) -> RequestOrigin {
        RequestOrigin {
            client_ip: self.client_ip.clone(),
            user_agent: self.user_agent.clone(),
            client_token: self.client_token.clone(),
        }
    }
}

/// An event and the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedEvent {
    pub line: usize,
    pub event: SubmissionEvent,
}

/// Load detections from a JSON Lines file.
pub fn load_detections<F: Filesystem>(fs: &F, path: &Path) -> Result<Vec<Detection>, LoadError> {
    let content = read(fs, path)?;
    parse_detections(&content)
}

/// Parse detections; each is validated.
pub fn parse_detections(content: &str) -> Result<Vec<Detection>, LoadError> {
    records(content)
        .map(|(line, text)| {
            Detection::from_json(text).map_err(|source| LoadError::Detection { line, source })
        })
        .collect()
}

/// Load submission events from a JSON Lines file, in file order.
pub fn load_events<F: Filesystem>(fs: &F, path: &Path) -> Result<Vec<LoadedEvent>, LoadError> {
    let content = read(fs, path)?;
    parse_events(&content)
}

pub fn parse_events(content: &str) -> Result<Vec<LoadedEvent>, LoadError> {
    records(content)
        .map(|(line, text)| {
            serde_json::from_str(text)
                .map(|event| LoadedEvent { line, event })
                .map_err(|source| LoadError::Event { line, source })
        })
        .collect()
}

/// Read a photo payload, resolving relative paths against `base_dir`.
pub fn load_photo<F: Filesystem>(
    fs: &F,
    base_dir: &Path,
    line: usize,
    photo: &PhotoRef,
) -> Result<Vec<u8>, LoadError> {
    let path = if photo.path.is_absolute() {
        photo.path.clone()
    } else {
        base_dir.join(&photo.path)
    };
    fs.read_bytes(&path)
        .map_err(|source| LoadError::Photo { line, source })
}

fn read<F: Filesystem>(fs: &F, path: &Path) -> Result<String, LoadError> {
    fs.read_file(path).map_err(|source| LoadError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Non-blank, non-comment lines with their 1-based numbers.
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use firewatch_fs::MockFilesystem;
    use firewatch_schema::DetectionStatus;

    const DETECTIONS: &str = r#"
# seeded detections
{"id":"fire-1","lat":38.5,"lon":-121.4,"created_at":"2025-08-01T11:00:00Z","confidence":0.8}

{"id":"fire-2","lat":38.6,"lon":-121.5,"created_at":"2025-08-01T11:30:00Z","confidence":0.4,"source":"viirs","fwi_bucket":5,"wind_dir_deg":90}
"#;

    // ===========================================
    // Detections
    // ===========================================

    #[test]
    fn test_parse_detections_skips_comments_and_blanks() {
        let detections = parse_detections(DETECTIONS).expect("parse");
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].id, "fire-1");
        assert_eq!(detections[0].source, "seed");
        assert_eq!(detections[0].status, DetectionStatus::Unconfirmed);
        assert_eq!(detections[1].fwi_bucket, 5);
        assert_eq!(detections[1].wind_dir_deg, 90);
    }

    #[test]
    fn test_parse_detections_reports_line() {
        let content = "# header\n{\"id\":\"a\",\"lat\":0,\"lon\":0,\"created_at\":\"2025-08-01T00:00:00Z\",\"confidence\":2.0}\n";
        let err = parse_detections(content).unwrap_err();
        assert!(matches!(err, LoadError::Detection { line: 2, .. }));
    }

    #[test]
    fn test_parse_detections_malformed_json() {
        let err = parse_detections("{not json").unwrap_err();
        assert!(matches!(err, LoadError::Detection { line: 1, .. }));
        assert!(err.to_string().contains("line 1"));
    }

    // ===========================================
    // Events
    // ===========================================

    #[test]
    fn test_parse_events_minimal_and_full() {
        let content = r#"{"at":"2025-08-01T12:00:00Z","detection_id":"fire-1","verdict":"confirm"}
{"at":"2025-08-01T12:00:05Z","detection_id":"fire-1","verdict":"deny","client_ip":"10.0.0.2","user_agent":"ua","client_token":"tok","photo":{"path":"p/1.jpg","content_type":"image/jpeg"}}"#;

        let events = parse_events(content).expect("parse");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].line, 1);
        assert_eq!(events[0].event.verdict, Verdict::Confirm);
        assert_eq!(events[0].event.origin(), RequestOrigin::new());
        assert_eq!(events[1].line, 2);
        assert_eq!(
            events[1].event.origin(),
            RequestOrigin::new()
                .with_ip("10.0.0.2")
                .with_user_agent("ua")
                .with_client_token("tok")
        );
        assert_eq!(
            events[1].event.photo.as_ref().map(|p| p.content_type.as_str()),
            Some("image/jpeg")
        );
    }

    #[test]
    fn test_parse_events_bad_verdict() {
        let content = "\n\n{\"at\":\"2025-08-01T12:00:00Z\",\"detection_id\":\"x\",\"verdict\":\"maybe\"}";
        let err = parse_events(content).unwrap_err();
        assert!(matches!(err, LoadError::Event { line: 3, .. }));
    }

    #[test]
    fn test_load_events_missing_file() {
        let fs = MockFilesystem::new();
        let err = load_events(&fs, Path::new("/in/events.jsonl")).unwrap_err();
        assert!(matches!(err, LoadError::Read { ref path, .. } if path == "/in/events.jsonl"));
    }

    // ===========================================
    // Photos
    // ===========================================

    #[test]
    fn test_load_photo_relative_and_absolute() {
        let fs = MockFilesystem::new();
        fs.add_file("/in/p/1.jpg", b"rel".to_vec());
        fs.add_file("/abs/2.png", b"abs".to_vec());

        let rel = PhotoRef {
            path: PathBuf::from("p/1.jpg"),
            content_type: "image/jpeg".to_string(),
        };
        let abs = PhotoRef {
            path: PathBuf::from("/abs/2.png"),
            content_type: "image/png".to_string(),
        };

        assert_eq!(load_photo(&fs, Path::new("/in"), 1, &rel).unwrap(), b"rel");
        assert_eq!(load_photo(&fs, Path::new("/in"), 2, &abs).unwrap(), b"abs");
    }

    #[test]
    fn test_load_photo_missing_reports_line() {
        let fs = MockFilesystem::new();
        let photo = PhotoRef {
            path: PathBuf::from("gone.jpg"),
            content_type: "image/jpeg".to_string(),
        };
        let err = load_photo(&fs, Path::new("/in"), 9, &photo).unwrap_err();
        assert!(matches!(err, LoadError::Photo { line: 9, .. }));
    }
}
