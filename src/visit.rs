//! Visit Tracker
//!
//! Duration telemetry for practice pages. One visit is one mount-to-unmount
//! lifetime of a part page:
//!
//! ```text
//! Idle --begin(part)--> Tracking --end()/drop--> Reported
//! ```
//!
//! The first question fetch doubles as the "visit begin" signal. The
//! closing report is the same request with `duration` attached, sent from a
//! detached task: nobody awaits it, failures are logged and never retried,
//! and the tracker moves to `Reported` whatever the outcome.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::ClientResult;
use crate::identity::DeviceIdentity;
use crate::local_storage::LocalStorage;
use crate::models::{Part, VisitRecord};
use crate::remote::{practice_request, ApiClient, QuestionClient};

/// User id reported for every anonymous visitor
pub const ANONYMOUS_USER: &str = "anonymous";

/// Wall-clock source in milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Whole seconds between two instants, floored and never negative
pub fn duration_seconds(start_ms: i64, end_ms: i64) -> u64 {
    ((end_ms - start_ms).max(0) / 1000) as u64
}

/// Where a tracker is in its visit lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitState {
    Idle,
    Tracking {
        part: Part,
        device_id: String,
        started_at_ms: i64,
    },
    Reported(VisitRecord),
}

/// Outcome of ending a visit
#[derive(Debug)]
pub struct VisitReport {
    pub record: VisitRecord,
    /// The detached beacon task; `None` when no runtime was available.
    /// Dropping it does not cancel the request.
    pub beacon: Option<JoinHandle<()>>,
}

pub struct VisitTracker {
    api: ApiClient,
    storage: Arc<dyn LocalStorage>,
    clock: Arc<dyn Clock>,
    user_id: String,
    state: VisitState,
}

impl VisitTracker {
    pub fn new(
        api: ApiClient,
        storage: Arc<dyn LocalStorage>,
        clock: Arc<dyn Clock>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            storage,
            clock,
            user_id: user_id.into(),
            state: VisitState::Idle,
        }
    }

    pub fn state(&self) -> &VisitState {
        &self.state
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, VisitState::Tracking { .. })
    }

    /// Start a visit and fetch the part's questions
    ///
    /// Tracking starts before the fetch and stays on even if the fetch
    /// fails. A visit still in progress is reported first.
    pub async fn begin(&mut self, part: Part) -> ClientResult<Vec<String>> {
        if self.is_tracking() {
            self.end();
        }

        let started_at_ms = self.clock.now_millis();
        let identity = DeviceIdentity::resolve(self.storage.as_ref())?;

        self.state = VisitState::Tracking {
            part,
            device_id: identity.device_id.clone(),
            started_at_ms,
        };

        tracing::info!(part = %part, device_id = %identity.device_id, "Visit started");

        QuestionClient::new(self.api.clone())
            .fetch_for_practice(part, &self.user_id, &identity.device_id, None)
            .await
    }

    /// Finish the visit and fire the duration beacon
    ///
    /// Returns `None` unless a visit was being tracked, so a visit is
    /// reported at most once.
    pub fn end(&mut self) -> Option<VisitReport> {
        let (part, device_id, started_at_ms) = match &self.state {
            VisitState::Tracking {
                part,
                device_id,
                started_at_ms,
            } => (*part, device_id.clone(), *started_at_ms),
            _ => return None,
        };

        let record = VisitRecord {
            user_id: self.user_id.clone(),
            device_id,
            part,
            duration_seconds: duration_seconds(started_at_ms, self.clock.now_millis()),
        };
        self.state = VisitState::Reported(record.clone());

        let beacon = self.spawn_beacon(&record);
        Some(VisitReport { record, beacon })
    }

    fn spawn_beacon(&self, record: &VisitRecord) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(part = %record.part, "No async runtime, visit duration not reported");
                return None;
            }
        };

        let transport = self.api.transport();
        let request = practice_request(
            record.part,
            &record.user_id,
            &record.device_id,
            Some(record.duration_seconds),
        );
        let part = record.part;
        let duration = record.duration_seconds;

        Some(runtime.spawn(async move {
            match transport.send(request).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!(part = %part, duration, "Visit duration reported");
                }
                Ok(response) => {
                    tracing::warn!(
                        part = %part,
                        status = response.status,
                        "Visit duration report rejected"
                    );
                }
                Err(e) => {
                    tracing::warn!(part = %part, error = %e, "Visit duration report failed");
                }
            }
        }))
    }
}

impl Drop for VisitTracker {
    fn drop(&mut self) {
        if self.is_tracking() {
            self.end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_storage::{MemoryStorage, DEVICE_ID_KEY};
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    struct Harness {
        transport: Arc<MockTransport>,
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                transport: Arc::new(MockTransport::new()),
                storage: Arc::new(MemoryStorage::new()),
                clock: Arc::new(ManualClock::new(1_000_000)),
            }
        }

        fn tracker(&self) -> VisitTracker {
            VisitTracker::new(
                ApiClient::new(self.transport.clone()),
                self.storage.clone(),
                self.clock.clone(),
                ANONYMOUS_USER,
            )
        }
    }

    #[test]
    fn test_duration_floor() {
        assert_eq!(duration_seconds(0, 5_500), 5);
        assert_eq!(duration_seconds(1_000, 1_999), 0);
        assert_eq!(duration_seconds(5_000, 1_000), 0);
    }

    #[tokio::test]
    async fn test_full_cycle_reports_floor_seconds() {
        let h = Harness::new();
        h.transport.respond(200, json!({ "questions": ["Q1", "Q2"] }));
        h.transport.respond(200, json!({ "questions": [] }));

        let mut tracker = h.tracker();
        assert_eq!(tracker.state(), &VisitState::Idle);

        let questions = tracker.begin(Part::Part2).await.unwrap();
        assert_eq!(questions, vec!["Q1", "Q2"]);
        assert!(tracker.is_tracking());

        h.clock.advance(5_500);
        let report = tracker.end().unwrap();
        assert_eq!(report.record.duration_seconds, 5);
        assert_eq!(report.record.user_id, ANONYMOUS_USER);
        report.beacon.unwrap().await.unwrap();

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/api/speaking/part2");
        assert_eq!(requests[0].query_value("duration"), None);
        assert_eq!(requests[1].query_value("duration"), Some("5"));
        assert_eq!(requests[0].query_value("device_id"), requests[1].query_value("device_id"));

        let stored = h.storage.get_item(DEVICE_ID_KEY).unwrap();
        assert_eq!(requests[0].query_value("device_id"), stored.as_deref());
        assert!(matches!(tracker.state(), VisitState::Reported(_)));
    }

    #[tokio::test]
    async fn test_end_reports_once() {
        let h = Harness::new();
        h.transport.respond(200, json!({ "questions": [] }));
        h.transport.respond(200, json!({}));

        let mut tracker = h.tracker();
        tracker.begin(Part::Part1).await.unwrap();

        let report = tracker.end().unwrap();
        report.beacon.unwrap().await.unwrap();
        assert!(tracker.end().is_none());
        drop(tracker);

        tokio::task::yield_now().await;
        assert_eq!(h.transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_beacon_still_reported() {
        let h = Harness::new();
        h.transport.respond(200, json!({ "questions": ["Q"] }));
        h.transport.fail("connection reset");

        let mut tracker = h.tracker();
        tracker.begin(Part::Part3).await.unwrap();
        h.clock.advance(2_000);

        let report = tracker.end().unwrap();
        report.beacon.unwrap().await.unwrap();

        match tracker.state() {
            VisitState::Reported(record) => assert_eq!(record.duration_seconds, 2),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_initial_fetch_keeps_tracking() {
        let h = Harness::new();
        h.transport.respond(503, json!({ "detail": "Service unavailable" }));

        let mut tracker = h.tracker();
        let err = tracker.begin(Part::Part1).await.unwrap_err();
        assert_eq!(err.to_string(), "Service unavailable");
        assert!(tracker.is_tracking());
    }

    #[tokio::test]
    async fn test_drop_while_tracking_reports() {
        let h = Harness::new();
        h.transport.respond(200, json!({ "questions": [] }));
        h.transport.respond(200, json!({}));

        let mut tracker = h.tracker();
        tracker.begin(Part::Part1).await.unwrap();
        h.clock.advance(3_200);
        drop(tracker);

        // Let the detached beacon run
        for _ in 0..10 {
            if h.transport.request_count() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].query_value("duration"), Some("3"));
    }

    #[tokio::test]
    async fn test_remount_starts_fresh_cycle() {
        let h = Harness::new();
        h.transport.respond(200, json!({ "questions": [] }));
        h.transport.respond(200, json!({}));
        h.transport.respond(200, json!({ "questions": [] }));

        let mut tracker = h.tracker();
        tracker.begin(Part::Part1).await.unwrap();
        h.clock.advance(4_000);
        let first = tracker.end().unwrap();
        first.beacon.unwrap().await.unwrap();
        assert_eq!(first.record.duration_seconds, 4);

        tracker.begin(Part::Part2).await.unwrap();
        h.clock.advance(1_000);
        match tracker.state() {
            VisitState::Tracking { part, started_at_ms, .. } => {
                assert_eq!(*part, Part::Part2);
                assert_eq!(*started_at_ms, 1_004_000);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_end_without_runtime_still_transitions() {
        let h = Harness::new();
        let mut tracker = h.tracker();
        tracker.state = VisitState::Tracking {
            part: Part::Part1,
            device_id: "d".to_string(),
            started_at_ms: 1_000_000,
        };
        h.clock.advance(1_500);

        let report = tracker.end().unwrap();
        assert!(report.beacon.is_none());
        assert_eq!(report.record.duration_seconds, 1);
        assert!(matches!(tracker.state(), VisitState::Reported(_)));
    }
}
