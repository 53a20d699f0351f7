//! Replay command orchestration.
//!
//! Seeds an in-memory store with detections, feeds recorded submissions
//! through the verification service in timestamp order on a mock clock, then
//! writes per-event outcomes, the listing and the metrics report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use firewatch_clock::{Clock, MockClock};
use firewatch_engine::{
    to_feature_collection, DetectionStore, EngineConfig, FsPhotoStore, Logger, MemoryStore,
    MetricsReport, PhotoUpload, SubmissionRequest, VerificationService,
};
use firewatch_fs::Filesystem;

use crate::cli::ReplayArgs;
use crate::io::{
    load_detections, load_events, load_photo, LoadedEvent, OutcomeRecord, OutputWriter,
};

use super::{CommandError, CommandResult};

/// Result of replay command execution.
#[derive(Debug)]
pub struct ReplayResult {
    pub detections_loaded: usize,
    pub events_replayed: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Rejections from rate limiting or cooldown.
    pub blocked: u64,
    /// Time the listing and metrics were evaluated at.
    pub as_of: DateTime<Utc>,
    pub listed: usize,
    pub metrics: MetricsReport,
    pub outcomes_path: PathBuf,
    pub listing_path: PathBuf,
    pub metrics_path: PathBuf,
}

/// Execute the replay command.
///
/// `base` is the environment-derived configuration; flags override it.
/// `clock` supplies the evaluation time only when there are no events and
/// no `--as-of`.
pub fn execute_replay<F, C>(
    args: &ReplayArgs,
    base: EngineConfig,
    fs: &F,
    clock: &C,
    logger: Arc<dyn Logger>,
) -> CommandResult<ReplayResult>
where
    F: Filesystem,
    C: Clock,
{
    args.validate()?;
    let config = args.apply_overrides(base);
    config.validate()?;

    let detections = load_detections(fs, &args.detections)?;
    let mut events = load_events(fs, &args.events)?;
    // stable: ties keep file order
    events.sort_by_key(|e| e.event.at);
    logger.info(&format!(
        "loaded {} detections and {} events",
        detections.len(),
        events.len()
    ));

    let store = Arc::new(MemoryStore::new());
    let detections_loaded = detections.len();
    for detection in detections {
        let id = detection.id.clone();
        store
            .insert(detection)
            .map_err(|source| CommandError::Seed { id, source })?;
    }

    let start = events.first().map(|e| e.event.at).unwrap_or_else(|| clock.now());
    let replay_clock = Arc::new(MockClock::new(start));
    let photos = FsPhotoStore::new(fs, config.photos_dir.clone());
    let save_photos = config.save_photos;
    let service = VerificationService::new(store, replay_clock.clone(), photos, config)
        .with_logger(logger.clone());

    let photo_base = args.events.parent().unwrap_or_else(|| Path::new(""));
    let mut outcomes = Vec::with_capacity(events.len());
    for LoadedEvent { line, event } in &events {
        replay_clock.set(event.at);

        let mut request =
            SubmissionRequest::new(event.detection_id.clone(), event.verdict, event.origin());
        if let (true, Some(photo)) = (save_photos, &event.photo) {
            let data = load_photo(fs, photo_base, *line, photo)?;
            request = request.with_photo(PhotoUpload::new(photo.content_type.clone(), data));
        }

        let record = match service.submit(request) {
            Ok(outcome) => OutcomeRecord::accepted(*line, event.at, &outcome),
            Err(err) => OutcomeRecord::rejected(*line, event.at, &event.detection_id, &err),
        };
        outcomes.push(record);
    }

    let as_of = args
        .as_of
        .or_else(|| events.last().map(|e| e.event.at))
        .unwrap_or(start);
    replay_clock.set(as_of);

    let listing = service.list_detections(args.window_hours, args.min_confidence)?;
    let metrics = service.metrics(args.window_hours)?;

    let writer = OutputWriter::new(fs, &args.out_dir);
    let written = writer.write_all(&outcomes, &to_feature_collection(&listing), &metrics)?;

    let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
    logger.verbose(&format!("wrote outputs to {}", args.out_dir.display()));

    Ok(ReplayResult {
        detections_loaded,
        events_replayed: outcomes.len(),
        accepted,
        rejected: outcomes.len() - accepted,
        blocked: service.abuse_stats().totals().blocked,
        as_of,
        listed: listing.len(),
        metrics,
        outcomes_path: written.outcomes,
        listing_path: written.listing,
        metrics_path: written.metrics,
    })
}
