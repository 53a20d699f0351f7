//! Verification submission pipeline.
//!
//! A submission passes, in order: attempt counting, per-IP rate limit,
//! fingerprinting, per-device cooldown, detection lookup, dismissed check,
//! duplicate check, optional photo handling, ledger append, recount and
//! consensus. Guard rejections count as abuse blocks; every other rejection
//! is returned as-is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use firewatch_clock::Clock;
use firewatch_guard::{
    hash_ip, AbuseStats, CooldownGuard, Fingerprint, RateLimiter, RequestOrigin,
};
use firewatch_schema::{AggregatedCounts, DetectionStatus, DeviceHash, NewVerification, Verdict};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::consensus::{self, ConsensusPolicy};
use crate::error::VerifyError;
use crate::ledger::{DetectionStore, VerificationLedger};
use crate::listing::{self, DetectionWithCounts};
use crate::logger::{Logger, NullLogger};
use crate::metrics::{MetricsAggregator, MetricsReport};
use crate::photo::{PhotoStore, PhotoUpload};

/// One inbound verdict.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub detection_id: String,
    pub verdict: Verdict,
    pub origin: RequestOrigin,
    pub photo: Option<PhotoUpload>,
}

impl SubmissionRequest {
    pub fn new(detection_id: impl Into<String>, verdict: Verdict, origin: RequestOrigin) -> Self {
        Self {
            detection_id: detection_id.into(),
            verdict,
            origin,
            photo: None,
        }
    }

    /// Builder: attach a photo.
    pub fn with_photo(mut self, photo: PhotoUpload) -> Self {
        self.photo = Some(photo);
        self
    }
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub detection_id: String,
    pub verification_id: u64,
    pub status: DetectionStatus,
    pub counts: AggregatedCounts,
}

/// Accepts crowd verdicts and keeps detection status in line with them.
pub struct VerificationService<S, C, P> {
    store: S,
    clock: C,
    photos: P,
    config: EngineConfig,
    policy: ConsensusPolicy,
    rate_limiter: RateLimiter,
    cooldown: CooldownGuard,
    abuse: Arc<AbuseStats>,
    logger: Arc<dyn Logger>,
    // held from the dismissed re-check through append, recount and status write
    status_lock: Mutex<()>,
}

impl<S, C, P> VerificationService<S, C, P>
where
    S: DetectionStore + VerificationLedger,
    C: Clock,
    P: PhotoStore,
{
    pub fn new(store: S, clock: C, photos: P, config: EngineConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_per_minute)
            .with_max_tracked_keys(config.max_tracked_keys);
        let cooldown = CooldownGuard::new(config.cooldown_seconds)
            .with_max_tracked_keys(config.max_tracked_keys);
        Self {
            store,
            clock,
            photos,
            policy: config.consensus_policy(),
            config,
            rate_limiter,
            cooldown,
            abuse: Arc::new(AbuseStats::new()),
            logger: Arc::new(NullLogger),
            status_lock: Mutex::new(()),
        }
    }

    /// Builder: set the logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Builder: share abuse counters with another component.
    pub fn with_abuse_stats(mut self, abuse: Arc<AbuseStats>) -> Self {
        self.abuse = abuse;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn abuse_stats(&self) -> &Arc<AbuseStats> {
        &self.abuse
    }

    /// Submit one verdict.
    pub fn submit(&self, request: SubmissionRequest) -> Result<SubmissionOutcome, VerifyError> {
        let now = self.clock.now();
        let detection_id = request.detection_id.clone();

        let result = self.process(request, now);
        if let Err(err) = &result {
            if !err.is_abuse_block() {
                self.logger.verbose(&format!(
                    "rejected verdict for {}: {} ({})",
                    detection_id,
                    err.kind(),
                    err
                ));
            }
        }
        result
    }

    fn process(
        &self,
        request: SubmissionRequest,
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome, VerifyError> {
        self.abuse.record_attempt();

        let ip = request.origin.ip();
        let ip_hash = hash_ip(ip);
        if !self.rate_limiter.check(ip, now) {
            self.abuse.record_block();
            self.logger
                .verbose(&format!("rate limited ip={}", short(&ip_hash)));
            return Err(VerifyError::RateLimited);
        }

        let device = Fingerprint::resolve(&request.origin).device_hash();
        if let Err(active) = self.cooldown.enforce(&device, now) {
            self.abuse.record_block();
            self.logger.verbose(&format!(
                "cooldown device={} retry_after={}s",
                device.short(),
                active.retry_after_secs
            ));
            return Err(active.into());
        }

        let detection = self
            .store
            .get(&request.detection_id)?
            .ok_or(VerifyError::NotFound)?;
        if !detection.status.accepts_verdicts() {
            return Err(VerifyError::Gone);
        }
        if self.store.exists_for_device(&detection.id, &device)? {
            return Err(VerifyError::Conflict);
        }

        // Stored before the status lock is taken. A submission rejected after
        // this point leaves its file behind; the content-addressed name is
        // reused if the same payload is submitted again.
        let photo_path = match request.photo {
            Some(photo) if self.config.save_photos => {
                let kind = photo.validate()?;
                self.photos.save(kind, &photo.data)?
            }
            _ => None,
        };

        let _guard = self.status_lock.lock();

        // A concurrent verdict may have dismissed the detection since the
        // first check.
        let current = self
            .store
            .get(&detection.id)?
            .ok_or(VerifyError::NotFound)?
            .status;
        if !current.accepts_verdicts() {
            return Err(VerifyError::Gone);
        }

        let stored = self.store.add(NewVerification {
            detection_id: detection.id.clone(),
            created_at: now,
            verdict: request.verdict,
            device_hash: device.clone(),
            ip_hash,
            photo_path,
        })?;
        self.logger.debug(&format!(
            "appended verification {} {} for {} from device={}",
            stored.id,
            stored.verdict,
            stored.detection_id,
            device.short()
        ));

        let (status, counts) = self.reconcile_status(&detection.id, current)?;

        Ok(SubmissionOutcome {
            detection_id: detection.id,
            verification_id: stored.id,
            status,
            counts,
        })
    }

    /// Recount, evaluate, and persist the status if it changed.
    ///
    /// Caller holds `status_lock`.
    fn reconcile_status(
        &self,
        detection_id: &str,
        current: DetectionStatus,
    ) -> Result<(DetectionStatus, AggregatedCounts), VerifyError> {
        let counts = self.store.counts(detection_id)?;

        match consensus::transition(current, &counts, &self.policy) {
            Some(next) => {
                self.store.set_status(detection_id, next)?;
                self.logger.info(&format!(
                    "detection {} {} -> {} (confirms={} denies={} unsure={})",
                    detection_id, current, next, counts.confirms, counts.denies, counts.unsure
                ));
                Ok((next, counts))
            }
            None => Ok((current, counts)),
        }
    }

    /// Current counts for a detection.
    pub fn get_counts(&self, detection_id: &str) -> Result<AggregatedCounts, VerifyError> {
        if self.store.get(detection_id)?.is_none() {
            return Err(VerifyError::NotFound);
        }
        Ok(self.store.counts(detection_id)?)
    }

    /// Non-dismissed detections from the last `hours`, newest first.
    pub fn list_detections(
        &self,
        hours: u32,
        min_confidence: f64,
    ) -> Result<Vec<DetectionWithCounts>, VerifyError> {
        Ok(listing::list_detections(
            &self.store,
            self.clock.now(),
            hours,
            min_confidence,
        )?)
    }

    /// Health metrics for the window ending now.
    pub fn metrics(&self, window_hours: u32) -> Result<MetricsReport, VerifyError> {
        Ok(MetricsAggregator::new(&self.store, &self.abuse).compute(self.clock.now(), window_hours)?)
    }

    /// Drop anti-abuse entries that no longer affect admission.
    pub fn sweep_guards(&self) -> usize {
        let now = self.clock.now();
        self.rate_limiter.sweep(now) + self.cooldown.sweep(now)
    }

    /// When `device` last passed the cooldown, if tracked.
    pub fn last_admitted(&self, device: &DeviceHash) -> Option<DateTime<Utc>> {
        self.cooldown.last_admitted(device)
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(12)]
}
