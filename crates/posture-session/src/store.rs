//! Storage collaborators for sessions, logs and calibration profiles.

use std::collections::HashMap;

use async_trait::async_trait;
use posture_core::{CalibrationProfile, SessionId};
use tokio::sync::RwLock;

use crate::record::PostureLogRecord;
use crate::report::SessionReport;
use crate::session::SessionSummary;

/// Longest session a store accepts, in minutes
pub const MAX_SESSION_MINUTES: f64 = 24.0 * 60.0;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for posture_core::Error {
    fn from(e: StoreError) -> Self {
        posture_core::Error::Persistence(e.to_string())
    }
}

/// Result of an idempotent session save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// A summary with this id was stored earlier; nothing changed
    AlreadySaved,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a summary. Saving the same session id twice must succeed without duplicating.
    async fn save_session(&self, summary: &SessionSummary) -> StoreResult<SaveOutcome>;

    async fn save_log(&self, record: &PostureLogRecord) -> StoreResult<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn save_profile(&self, key: &str, profile: &CalibrationProfile) -> StoreResult<()>;

    async fn load_profile(&self, key: &str) -> StoreResult<Option<CalibrationProfile>>;
}

/// Range checks a summary must pass before it is stored
pub fn validate_summary(summary: &SessionSummary) -> StoreResult<()> {
    let checks = [
        (
            "duration_minutes",
            summary.duration_minutes,
            0.0..=MAX_SESSION_MINUTES,
        ),
        (
            "good_posture_percentage",
            summary.good_posture_percentage,
            0.0..=100.0,
        ),
        ("average_score", summary.grade, 0.0..=10.0),
    ];
    for (name, value, range) in checks {
        if !range.contains(&value) {
            return Err(StoreError::InvalidRecord(format!("{name} out of range: {value}")));
        }
    }
    if summary.end_time < summary.start_time {
        return Err(StoreError::InvalidRecord("end_time before start_time".into()));
    }
    Ok(())
}

/// Process-local store implementing every collaborator trait
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionSummary>>,
    logs: RwLock<Vec<PostureLogRecord>>,
    profiles: RwLock<HashMap<String, CalibrationProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session(&self, id: SessionId) -> Option<SessionSummary> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Stored logs for a session, in insertion order
    pub async fn logs_for(&self, id: SessionId) -> Vec<PostureLogRecord> {
        self.logs
            .read()
            .await
            .iter()
            .filter(|r| r.session_id == id)
            .cloned()
            .collect()
    }

    /// Stored session with common issues and recommendations drawn from its logs
    pub async fn report(&self, id: SessionId) -> Option<SessionReport> {
        let summary = self.session(id).await?;
        Some(SessionReport::new(summary, &self.logs_for(id).await))
    }

    /// All sessions, newest start first
    pub async fn all_sessions(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        sessions
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn save_session(&self, summary: &SessionSummary) -> StoreResult<SaveOutcome> {
        validate_summary(summary)?;

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&summary.session_id) {
            tracing::debug!(session_id = %summary.session_id, "session already saved");
            return Ok(SaveOutcome::AlreadySaved);
        }
        sessions.insert(summary.session_id, summary.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn save_log(&self, record: &PostureLogRecord) -> StoreResult<()> {
        if !record.score.is_finite() {
            return Err(StoreError::InvalidRecord("score is not finite".into()));
        }
        let mut stored = record.clone();
        stored.score = stored.score.clamp(0.0, 10.0);
        self.logs.write().await.push(stored);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn save_profile(&self, key: &str, profile: &CalibrationProfile) -> StoreResult<()> {
        profile
            .validate()
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        self.profiles
            .write()
            .await
            .insert(key.to_string(), profile.clone());
        Ok(())
    }

    async fn load_profile(&self, key: &str) -> StoreResult<Option<CalibrationProfile>> {
        Ok(self.profiles.read().await.get(key).cloned())
    }
}
