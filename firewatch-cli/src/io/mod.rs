//! IO helpers for the replay command.
//!
//! - Loading detections, events and photo payloads
//! - Writing replay artifacts (outcomes.jsonl, detections.geojson, metrics.json)

pub mod event_loader;
pub mod output_writer;

pub use event_loader::{
    load_detections, load_events, load_photo, LoadError, LoadedEvent, PhotoRef, SubmissionEvent,
};
pub use output_writer::{OutcomeRecord, OutputWriter, OutputWriterError, WrittenFiles};
