//! End-to-end submission scenarios against the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use chrono::{DateTime, Duration, TimeZone, Utc};
use firewatch_clock::MockClock;
use firewatch_engine::{
    EngineConfig, FsPhotoStore, MemoryStore, MetricsReport, NoPhotoStore, PhotoUpload,
    SubmissionOutcome, SubmissionRequest, VerificationService, VerifyError,
};
use firewatch_engine::{DetectionStore, LedgerError, VerificationLedger};
use firewatch_fs::RealFilesystem;
use firewatch_guard::{Fingerprint, RequestOrigin};
use firewatch_schema::{
    AggregatedCounts, Detection, DetectionStatus, DeviceHash, NewVerification, Verdict,
    Verification,
};
use tempfile::TempDir;

type Service = VerificationService<Arc<MemoryStore>, Arc<MockClock>, NoPhotoStore>;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap()
}

fn device(n: u32) -> RequestOrigin {
    RequestOrigin::new()
        .with_ip(format!("198.51.100.{n}"))
        .with_user_agent("FirewatchTest/1.0")
        .with_client_token(format!("device-{n}"))
}

fn setup(config: EngineConfig) -> (Service, Arc<MemoryStore>, Arc<MockClock>) {
    let store = Arc::new(MemoryStore::new());
    store
        .insert(Detection::new("fire-1", 38.58, -121.49, t0(), 0.8))
        .unwrap();
    let clock = Arc::new(MockClock::new(t0()));
    let svc = VerificationService::new(store.clone(), clock.clone(), NoPhotoStore, config);
    (svc, store, clock)
}

fn submit(svc: &Service, verdict: Verdict, n: u32) -> Result<SubmissionOutcome, VerifyError> {
    svc.submit(SubmissionRequest::new("fire-1", verdict, device(n)))
}

// ===========================================
// Consensus through the pipeline
// ===========================================

#[test]
fn test_confirm_then_deny_stays_accepted() {
    let (svc, _, _) = setup(EngineConfig::new());

    let first = submit(&svc, Verdict::Confirm, 1).unwrap();
    assert_eq!(first.status, DetectionStatus::Accepted);
    assert_eq!(first.counts, AggregatedCounts::new(1, 0, 0));

    let second = submit(&svc, Verdict::Deny, 2).unwrap();
    assert_eq!(second.status, DetectionStatus::Accepted);
    assert_eq!(second.counts, AggregatedCounts::new(1, 1, 0));
}

#[test]
fn test_two_denies_dismiss_then_gone() {
    let (svc, store, _) = setup(
        EngineConfig::new()
            .with_dismiss_deny_threshold(2)
            .with_deny_must_exceed_confirm(true),
    );

    assert_eq!(
        submit(&svc, Verdict::Deny, 1).unwrap().status,
        DetectionStatus::Unconfirmed
    );
    let second = submit(&svc, Verdict::Deny, 2).unwrap();
    assert_eq!(second.counts, AggregatedCounts::new(0, 2, 0));
    assert_eq!(second.status, DetectionStatus::Dismissed);

    let err = submit(&svc, Verdict::Confirm, 3).unwrap_err();
    assert!(matches!(err, VerifyError::Gone));
    assert_eq!(err.status_code(), 410);
    assert_eq!(store.counts("fire-1").unwrap(), AggregatedCounts::new(0, 2, 0));
}

#[test]
fn test_accepted_survives_many_denies() {
    let (svc, _, _) = setup(EngineConfig::new().with_deny_must_exceed_confirm(false));
    submit(&svc, Verdict::Confirm, 1).unwrap();
    for n in 2..12 {
        assert_eq!(
            submit(&svc, Verdict::Deny, n).unwrap().status,
            DetectionStatus::Accepted
        );
    }
}

#[test]
fn test_unsure_votes_leave_status_alone() {
    let (svc, _, _) = setup(EngineConfig::new());
    for n in 1..5 {
        let out = submit(&svc, Verdict::Unsure, n).unwrap();
        assert_eq!(out.status, DetectionStatus::Unconfirmed);
    }
}

// ===========================================
// Duplicate prevention
// ===========================================

#[test]
fn test_second_vote_from_device_conflicts() {
    let (svc, store, clock) = setup(EngineConfig::new());
    submit(&svc, Verdict::Confirm, 7).unwrap();
    clock.advance(Duration::minutes(5));

    let err = submit(&svc, Verdict::Deny, 7).unwrap_err();

    assert!(matches!(err, VerifyError::Conflict));
    assert!(!err.is_retriable());
    assert_eq!(store.verifications().len(), 1);
}

#[test]
fn test_concurrent_duplicate_submissions_store_one() {
    let (svc, store, _) = setup(EngineConfig::new().with_cooldown_seconds(0));
    let accepted = AtomicUsize::new(0);
    let conflicts = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| match submit(&svc, Verdict::Deny, 42) {
                Ok(_) => {
                    accepted.fetch_add(1, Ordering::SeqCst);
                }
                Err(VerifyError::Conflict) => {
                    conflicts.fetch_add(1, Ordering::SeqCst);
                }
                Err(other) => panic!("unexpected error: {other}"),
            });
        }
    });

    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(conflicts.load(Ordering::SeqCst), 7);
    assert_eq!(store.verifications().len(), 1);
}

#[test]
fn test_concurrent_distinct_devices_all_counted() {
    let (svc, store, _) = setup(EngineConfig::new());

    std::thread::scope(|s| {
        for n in 0..16 {
            let svc = &svc;
            s.spawn(move || {
                let verdict = if n % 2 == 0 { Verdict::Confirm } else { Verdict::Unsure };
                submit(svc, verdict, n).unwrap();
            });
        }
    });

    assert_eq!(store.counts("fire-1").unwrap(), AggregatedCounts::new(8, 0, 8));
    assert_eq!(
        store.get("fire-1").unwrap().unwrap().status,
        DetectionStatus::Accepted
    );
}

/// Parks one device inside the duplicate lookup until released.
struct GatedStore {
    inner: Arc<MemoryStore>,
    gated: DeviceHash,
    reached: Barrier,
    release: Barrier,
}

impl DetectionStore for GatedStore {
    fn insert(&self, detection: Detection) -> Result<(), LedgerError> {
        self.inner.insert(detection)
    }

    fn get(&self, id: &str) -> Result<Option<Detection>, LedgerError> {
        self.inner.get(id)
    }

    fn list_since(
        &self,
        since: DateTime<Utc>,
        min_confidence: f64,
        include_dismissed: bool,
    ) -> Result<Vec<Detection>, LedgerError> {
        self.inner.list_since(since, min_confidence, include_dismissed)
    }

    fn set_status(&self, id: &str, status: DetectionStatus) -> Result<(), LedgerError> {
        self.inner.set_status(id, status)
    }
}

impl VerificationLedger for GatedStore {
    fn exists_for_device(
        &self,
        detection_id: &str,
        device_hash: &DeviceHash,
    ) -> Result<bool, LedgerError> {
        if *device_hash == self.gated {
            self.reached.wait();
            self.release.wait();
        }
        self.inner.exists_for_device(detection_id, device_hash)
    }

    fn add(&self, verification: NewVerification) -> Result<Verification, LedgerError> {
        self.inner.add(verification)
    }

    fn counts(&self, detection_id: &str) -> Result<AggregatedCounts, LedgerError> {
        self.inner.counts(detection_id)
    }

    fn count_total_in_window(&self, since: DateTime<Utc>) -> Result<u64, LedgerError> {
        self.inner.count_total_in_window(since)
    }

    fn count_for_detection_between(
        &self,
        detection_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        self.inner.count_for_detection_between(detection_id, start, end)
    }
}

#[test]
fn test_dismissal_during_inflight_confirm_stays_dismissed() {
    let inner = Arc::new(MemoryStore::new());
    inner
        .insert(Detection::new("fire-1", 38.58, -121.49, t0(), 0.8))
        .unwrap();
    let store = GatedStore {
        inner: inner.clone(),
        gated: Fingerprint::resolve(&device(3)).device_hash(),
        reached: Barrier::new(2),
        release: Barrier::new(2),
    };
    let svc = VerificationService::new(
        store,
        Arc::new(MockClock::new(t0())),
        NoPhotoStore,
        EngineConfig::new(),
    );
    let on = |verdict, n| svc.submit(SubmissionRequest::new("fire-1", verdict, device(n)));

    on(Verdict::Deny, 1).unwrap();

    let late = std::thread::scope(|s| {
        // passes the first dismissed check, then parks
        let late = s.spawn(|| on(Verdict::Confirm, 3));
        svc.store().reached.wait();

        let dismissing = on(Verdict::Deny, 2).unwrap();
        assert_eq!(dismissing.status, DetectionStatus::Dismissed);

        svc.store().release.wait();
        late.join().unwrap()
    });

    assert!(matches!(late, Err(VerifyError::Gone)));
    assert_eq!(
        inner.get("fire-1").unwrap().unwrap().status,
        DetectionStatus::Dismissed
    );
    assert_eq!(inner.counts("fire-1").unwrap(), AggregatedCounts::new(0, 2, 0));
    assert_eq!(inner.verifications().len(), 2);
}

// ===========================================
// Admission control
// ===========================================

#[test]
fn test_rate_limit_31_in_a_second_blocks_one() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..31 {
        store
            .insert(Detection::new(format!("d{i}"), 0.0, 0.0, t0(), 0.5))
            .unwrap();
    }
    let clock = Arc::new(MockClock::new(t0()));
    let svc = VerificationService::new(
        store.clone(),
        clock.clone(),
        NoPhotoStore,
        EngineConfig::new(),
    );

    let mut limited = 0;
    for i in 0..31 {
        let origin = RequestOrigin::new()
            .with_ip("203.0.113.9")
            .with_client_token(format!("tok-{i}"));
        match svc.submit(SubmissionRequest::new(format!("d{i}"), Verdict::Unsure, origin)) {
            Ok(_) => {}
            Err(VerifyError::RateLimited) => limited += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
        clock.advance(Duration::milliseconds(30));
    }

    assert_eq!(limited, 1);
    assert_eq!(store.verifications().len(), 30);
    let totals = svc.abuse_stats().totals();
    assert_eq!((totals.attempts, totals.blocked), (31, 1));
}

#[test]
fn test_cooldown_blocks_then_admits() {
    let (svc, store, clock) = setup(EngineConfig::new().with_cooldown_seconds(30));
    store
        .insert(Detection::new("fire-2", 0.0, 0.0, t0(), 0.5))
        .unwrap();
    store
        .insert(Detection::new("fire-3", 0.0, 0.0, t0(), 0.5))
        .unwrap();
    let on = |id: &str| SubmissionRequest::new(id, Verdict::Confirm, device(5));

    svc.submit(on("fire-1")).unwrap();
    clock.advance(Duration::seconds(10));
    let err = svc.submit(on("fire-2")).unwrap_err();
    assert!(matches!(err, VerifyError::CooldownActive { retry_after_secs: 20 }));
    assert!(err.is_retriable());

    clock.advance(Duration::seconds(20));
    assert!(svc.submit(on("fire-3")).is_ok());
    assert_eq!(svc.abuse_stats().totals().blocked, 1);
}

// ===========================================
// Metrics
// ===========================================

#[test]
fn test_empty_window_metrics() {
    let store = Arc::new(MemoryStore::new());
    let svc = VerificationService::new(
        store,
        Arc::new(MockClock::new(t0())),
        NoPhotoStore,
        EngineConfig::new(),
    );
    assert_eq!(svc.metrics(24).unwrap(), MetricsReport::empty(24));
}

#[test]
fn test_metrics_idempotent_and_north_star() {
    let (svc, _, clock) = setup(EngineConfig::new());
    for n in 1..=3 {
        submit(&svc, Verdict::Confirm, n).unwrap();
        clock.advance(Duration::minutes(10));
    }

    let first = svc.metrics(24).unwrap();
    let second = svc.metrics(24).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.totals.detections, 1);
    assert_eq!(first.totals.accepted, 1);
    assert_eq!(first.totals.verifications, 3);
    assert!((first.north_star_pct - 100.0).abs() < 1e-9);
    assert_eq!(first.false_alarm_rate, 0.0);
}

// ===========================================
// Photos on disk
// ===========================================

#[test]
fn test_photo_written_to_real_directory() {
    let dir = TempDir::new().expect("create temp dir");
    let store = Arc::new(MemoryStore::new());
    store
        .insert(Detection::new("fire-1", 0.0, 0.0, t0(), 0.5))
        .unwrap();
    let svc = VerificationService::new(
        store.clone(),
        MockClock::new(t0()),
        FsPhotoStore::new(RealFilesystem, dir.path().join("photos")),
        EngineConfig::new(),
    );

    svc.submit(
        SubmissionRequest::new("fire-1", Verdict::Confirm, device(1))
            .with_photo(PhotoUpload::new("image/webp", b"webp-bytes".to_vec())),
    )
    .unwrap();

    let path = store.verifications()[0].photo_path.clone().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"webp-bytes");
    assert!(path.ends_with(".webp"));
}
