//! End-to-end connection scenarios driven through the JSON text interface.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use posture_api::{ClientMessage, Connection, ServerMessage, ServiceConfig};
use posture_core::{PostureStatus, Timestamp};
use posture_session::{
    InMemoryStore, PostureLogRecord, SaveOutcome, SessionStore, SessionSummary, StoreError,
    StoreResult,
};
use serde_json::json;

fn at(secs: f64) -> Timestamp {
    Timestamp::from_secs_f64(1_700_000_000.0 + secs)
}

fn landmarks(nose_y: f64, left_shoulder_y: f64, right_shoulder_y: f64) -> serde_json::Value {
    json!({
        "0": {"x": 0.5, "y": nose_y, "visibility": 0.99},
        "7": {"x": 0.56, "y": 0.48, "visibility": 0.95},
        "8": {"x": 0.44, "y": 0.48, "visibility": 0.95},
        "11": {"x": 0.65, "y": left_shoulder_y, "visibility": 0.98},
        "12": {"x": 0.35, "y": right_shoulder_y, "visibility": 0.98},
        "23": {"x": 0.62, "y": 0.95, "visibility": 0.1},
        "24": {"x": 0.38, "y": 0.95, "visibility": 0.1}
    })
}

fn message(action: &str, landmarks: serde_json::Value) -> String {
    json!({"action": action, "landmarks": landmarks}).to_string()
}

/// Calibrate on upright frames at 10 fps starting at `t0`; returns the time after the last frame
async fn calibrate<S: SessionStore>(conn: &mut Connection<S>, t0: f64) -> f64 {
    let mut t = t0;
    for _ in 0..20 {
        conn.handle_text_at(&message("calibrate_landmarks", landmarks(0.5, 0.5, 0.5)), at(t))
            .await;
        t += 0.1;
    }
    t
}

#[tokio::test]
async fn full_monitoring_session() {
    let store = Arc::new(InMemoryStore::new());
    let mut conn = Connection::new(Arc::clone(&store), ServiceConfig::default());

    let mut t = calibrate(&mut conn, 0.0).await;
    assert!(conn.analyzer().profile().is_some());

    let started = conn.handle_text_at(r#"{"action": "start_session"}"#, at(t)).await;
    let session_id = match started.as_slice() {
        [ServerMessage::SessionStarted { session_id }] => *session_id,
        other => panic!("unexpected {other:?}"),
    };

    // Ten seconds upright, then ten seconds slouched, at 5 fps
    let mut statuses = Vec::new();
    let mut alerts = 0;
    for i in 0..100 {
        t += 0.2;
        let frame = if i < 50 {
            landmarks(0.5, 0.5, 0.5)
        } else {
            landmarks(0.7, 0.62, 0.56)
        };
        for reply in conn.handle_text_at(&message("process_landmarks", frame), at(t)).await {
            match reply {
                ServerMessage::Metrics(metrics) => statuses.push(metrics.status),
                ServerMessage::Alert { .. } => alerts += 1,
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    assert_eq!(statuses.len(), 100);
    assert!(statuses[..50].iter().all(|s| *s == PostureStatus::Good));
    assert_ne!(statuses[99], PostureStatus::Good);
    assert_eq!(alerts, 1);

    t += 0.2;
    let stats = json!({"action": "update_session_stats", "good_time_sec": 10.0, "bad_time_sec": 10.0});
    conn.handle_text_at(&stats.to_string(), at(t)).await;

    let log = json!({
        "action": "log_posture",
        "score": 6.1,
        "status": "warning",
        "issues": [{"type": "forward_head", "severity": "moderate", "advice": "Pull your head back"}]
    });
    t += 0.2;
    conn.handle_text_at(&log.to_string(), at(t)).await;

    t += 0.2;
    let stopped = conn.handle_text_at(r#"{"action": "stop_session"}"#, at(t)).await;
    let [ServerMessage::SessionStopped(stopped)] = stopped.as_slice() else {
        panic!("expected session_stopped, got {stopped:?}");
    };

    let summary = &stopped.summary;
    assert_eq!(summary.session_id, session_id);
    assert!(stopped.save_error.is_none());
    assert_eq!(summary.good_posture_percentage, 50.0);
    assert_eq!(summary.total_logs, 1);
    assert!(summary.grade > 5.0 && summary.grade < 10.0);
    assert!(!summary.most_common_issues.is_empty());

    assert_eq!(store.session(session_id).await.as_ref(), Some(summary));
    assert_eq!(store.logs_for(session_id).await[0].status, PostureStatus::Warning);

    // Nothing left to auto-save
    assert!(conn.close().await.unwrap().is_none());
    assert_eq!(store.session_count().await, 1);
}

#[tokio::test]
async fn stored_profile_restores_scoring() {
    let mut first = Connection::new(Arc::new(InMemoryStore::new()), ServiceConfig::default());
    let mut profile = None;
    for i in 0..20 {
        let replies = first
            .handle_text_at(
                &message("calibrate_landmarks", landmarks(0.5, 0.5, 0.5)),
                at(i as f64 * 0.1),
            )
            .await;
        if let [ServerMessage::CalibrationComplete { profile: p }] = replies.as_slice() {
            profile = Some(p.clone());
        }
    }
    let profile = profile.expect("calibration completes on the 20th frame");

    // A new connection receives the profile the client kept
    let mut second = Connection::new(Arc::new(InMemoryStore::new()), ServiceConfig::default());
    let set = json!({"action": "set_profile", "profile": profile});
    let replies = second.handle_text_at(&set.to_string(), at(0.0)).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(serde_json::to_value(&replies[0]).unwrap()["data"]["success"], true);
    assert_eq!(second.analyzer().profile(), Some(&profile));
}

/// Store whose backend is down for sessions and logs
#[derive(Default)]
struct FailingStore {
    attempts: AtomicUsize,
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn save_session(&self, _summary: &SessionSummary) -> StoreResult<SaveOutcome> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend("database unavailable".into()))
    }

    async fn save_log(&self, _record: &PostureLogRecord) -> StoreResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend("database unavailable".into()))
    }
}

#[tokio::test]
async fn persistence_failures_are_reported() {
    let store = Arc::new(FailingStore::default());
    let mut conn = Connection::new(Arc::clone(&store), ServiceConfig::default());

    conn.handle(ClientMessage::StartSession).await.unwrap();

    let log = ClientMessage::LogPosture {
        score: json!(7),
        status: json!("good"),
        issues: json!([]),
    };
    assert!(conn.handle(log).await.is_err());
    // The text interface swallows the same failure
    let text = json!({"action": "log_posture", "score": 7, "status": "good"}).to_string();
    assert!(conn.handle_text(&text).await.is_empty());
    assert_eq!(conn.session().log_count(), 0);

    let replies = conn.handle(ClientMessage::StopSession).await.unwrap();
    let [ServerMessage::SessionStopped(stopped)] = replies.as_slice() else {
        panic!("expected session_stopped");
    };
    assert!(stopped
        .save_error
        .as_deref()
        .is_some_and(|e| e.contains("database unavailable")));
    assert_eq!(
        serde_json::to_value(&replies[0]).unwrap()["data"]["save_error"],
        "Storage backend error: database unavailable"
    );

    // The unsaved summary is retried on close and fails again
    assert_eq!(conn.unsaved_sessions(), &[stopped.summary.clone()]);
    let err = conn.close().await.unwrap_err();
    assert!(matches!(err, posture_core::Error::Persistence(_)));
    assert_eq!(store.attempts.load(Ordering::SeqCst), 4);
    assert_eq!(conn.unsaved_sessions().len(), 1);
}

/// Store that rejects the first session save, then recovers
#[derive(Default)]
struct FlakyStore {
    failed_once: AtomicBool,
    saved: Mutex<Vec<SessionSummary>>,
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn save_session(&self, summary: &SessionSummary) -> StoreResult<SaveOutcome> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset".into()));
        }
        self.saved.lock().unwrap().push(summary.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn save_log(&self, _record: &PostureLogRecord) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn close_retries_failed_auto_save() {
    let store = Arc::new(FlakyStore::default());
    let mut conn = Connection::new(Arc::clone(&store), ServiceConfig::default());
    conn.handle(ClientMessage::StartSession).await.unwrap();

    let err = conn.close().await.unwrap_err();
    assert!(matches!(err, posture_core::Error::Persistence(_)));
    assert!(!conn.session().is_active());
    assert_eq!(conn.unsaved_sessions().len(), 1);

    // The summary survived the failure and the retry persists it
    let summary = conn.close().await.unwrap().expect("pending summary is saved");
    assert_eq!(*store.saved.lock().unwrap(), vec![summary]);
    assert!(conn.unsaved_sessions().is_empty());
    assert!(conn.close().await.unwrap().is_none());
}

#[tokio::test]
async fn failed_stop_save_retried_on_close() {
    let store = Arc::new(FlakyStore::default());
    let mut conn = Connection::new(Arc::clone(&store), ServiceConfig::default());
    conn.handle(ClientMessage::StartSession).await.unwrap();

    let replies = conn.handle(ClientMessage::StopSession).await.unwrap();
    let [ServerMessage::SessionStopped(stopped)] = replies.as_slice() else {
        panic!("expected session_stopped");
    };
    assert!(stopped.save_error.is_some());

    let saved = conn.close().await.unwrap();
    assert_eq!(saved.as_ref(), Some(&stopped.summary));
    assert_eq!(store.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn summary_wire_format() {
    let store = Arc::new(InMemoryStore::new());
    let mut conn = Connection::new(Arc::clone(&store), ServiceConfig::default());
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let start_ts = Timestamp::from_nanos(start.timestamp_nanos_opt().unwrap());

    conn.handle_at(ClientMessage::StartSession, start_ts).await.unwrap();
    let end = Timestamp::from_nanos(start_ts.as_nanos() + 1_800 * 1_000_000_000);
    let replies = conn.handle_at(ClientMessage::StopSession, end).await.unwrap();

    let json = serde_json::to_value(&replies[0]).unwrap();
    assert_eq!(json["type"], "session_stopped");
    let data = &json["data"];
    assert_eq!(data["duration_minutes"], 30.0);
    assert_eq!(data["average_score"], 10.0);
    assert_eq!(data["good_posture_percentage"], 100.0);
    assert!(data.get("save_error").is_none());
    assert!(data["start_time"].as_str().unwrap().starts_with("2024-05-01T09:00:00"));
}
