//! Per-connection controller.
//!
//! A [`Connection`] owns exactly one calibrator, analyzer and session manager
//! and processes client messages strictly in arrival order. Transport is left
//! to the caller: feed it text (or parsed messages) and forward whatever
//! server messages come back.

use std::sync::Arc;

use posture_analysis::{Calibrator, PostureAnalyzer};
use posture_core::{round1, CalibrationProfile, Error, Result, Timestamp};
use posture_session::{
    PostureLogRecord, SaveOutcome, SessionManager, SessionStore, SessionSummary,
};
use serde_json::{Map, Value};

use crate::config::ServiceConfig;
use crate::protocol::{
    CalibrationProgressData, ClientMessage, MetricsData, ProfileLoaded, ServerMessage,
    SessionStats, SessionStopped,
};
use crate::rate_limit::RateLimiter;
use crate::sanitize;

const FALLBACK_ALERT_MESSAGE: &str = "Poor posture detected";

pub struct Connection<S: SessionStore> {
    config: ServiceConfig,
    store: Arc<S>,
    calibrator: Calibrator,
    analyzer: PostureAnalyzer,
    session: SessionManager,
    limiter: RateLimiter,
    audio_enabled: bool,
    last_activity: Option<Timestamp>,
    /// Finished sessions whose save failed, retried on close
    unsaved: Vec<SessionSummary>,
}

impl<S: SessionStore> Connection<S> {
    pub fn new(store: Arc<S>, config: ServiceConfig) -> Self {
        Self {
            calibrator: Calibrator::with_config(config.calibration.clone()),
            analyzer: PostureAnalyzer::with_config(None, config.analyzer.clone()),
            session: SessionManager::new(),
            limiter: RateLimiter::from_limits(&config.limits),
            audio_enabled: true,
            last_activity: None,
            unsaved: Vec::new(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn analyzer(&self) -> &PostureAnalyzer {
        &self.analyzer
    }

    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn unsaved_sessions(&self) -> &[SessionSummary] {
        &self.unsaved
    }

    pub async fn handle_text(&mut self, text: &str) -> Vec<ServerMessage> {
        self.handle_text_at(text, Timestamp::now()).await
    }

    /// Process one raw text message received at `now`.
    ///
    /// Oversized, rate-limited and malformed input is dropped. Errors are
    /// logged and never surface to the client.
    pub async fn handle_text_at(&mut self, text: &str, now: Timestamp) -> Vec<ServerMessage> {
        self.last_activity = Some(now);

        if text.len() > self.config.limits.max_message_bytes {
            tracing::warn!(bytes = text.len(), "oversized message dropped");
            return Vec::new();
        }
        if !self.limiter.allow_at(now) {
            tracing::debug!("rate limit exceeded, message dropped");
            return Vec::new();
        }

        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "malformed message dropped");
                return Vec::new();
            }
        };

        match self.handle_at(message, now).await {
            Ok(replies) => replies,
            Err(e) => {
                tracing::warn!(error = %e, "message handling failed");
                Vec::new()
            }
        }
    }

    pub async fn handle(&mut self, message: ClientMessage) -> Result<Vec<ServerMessage>> {
        self.handle_at(message, Timestamp::now()).await
    }

    /// Process one parsed message to completion
    pub async fn handle_at(
        &mut self,
        message: ClientMessage,
        now: Timestamp,
    ) -> Result<Vec<ServerMessage>> {
        let replies = match message {
            ClientMessage::SetProfile { profile } => self.set_profile(profile).into_iter().collect(),
            ClientMessage::CalibrateLandmarks { landmarks } => vec![self.calibrate(&landmarks)],
            ClientMessage::ProcessLandmarks { landmarks } => self.process(&landmarks, now),
            ClientMessage::StartSession => {
                let session_id = self.session.start_at(now.to_datetime());
                vec![ServerMessage::SessionStarted { session_id }]
            }
            ClientMessage::StopSession => self.stop_session(now).await.into_iter().collect(),
            ClientMessage::ToggleAudio { enabled } => {
                tracing::debug!(enabled, "audio toggled");
                self.audio_enabled = enabled;
                Vec::new()
            }
            ClientMessage::UpdateSessionStats {
                good_time_sec,
                bad_time_sec,
            } => {
                self.session.set_tracked_time(
                    sanitize::sanitize_seconds(&good_time_sec),
                    sanitize::sanitize_seconds(&bad_time_sec),
                );
                Vec::new()
            }
            ClientMessage::LogPosture {
                score,
                status,
                issues,
            } => {
                self.log_posture(&score, &status, &issues).await?;
                Vec::new()
            }
            ClientMessage::Pong => Vec::new(),
        };
        Ok(replies)
    }

    /// Keepalive ping once `idle_timeout_secs` pass without client traffic
    pub fn idle_check_at(&mut self, now: Timestamp) -> Option<ServerMessage> {
        let last = *self.last_activity.get_or_insert(now);
        if now.secs_since(last) < self.config.limits.idle_timeout_secs {
            return None;
        }
        self.last_activity = Some(now);
        Some(ServerMessage::Ping)
    }

    /// Connection teardown: stop a still-active session, then persist every
    /// summary whose save has not yet succeeded.
    ///
    /// Summaries that fail again stay pending, so `close` may be called again
    /// once the store recovers. Returns the last summary saved by this call.
    pub async fn close(&mut self) -> Result<Option<SessionSummary>> {
        if self.session.is_active() {
            let summary = self.finish_session(Timestamp::now())?;
            tracing::info!(session_id = %summary.session_id, "auto-saving session on close");
            self.unsaved.push(summary);
        }

        let mut saved = None;
        let mut first_error = None;
        for summary in std::mem::take(&mut self.unsaved) {
            match self.store.save_session(&summary).await {
                Ok(_) => saved = Some(summary),
                Err(e) => {
                    tracing::warn!(session_id = %summary.session_id, error = %e, "session save failed on close");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    self.unsaved.push(summary);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(saved),
        }
    }

    fn set_profile(&mut self, profile: Option<Value>) -> Option<ServerMessage> {
        let raw = match profile {
            None | Some(Value::Null) => return None,
            Some(Value::Object(map)) if map.is_empty() => return None,
            Some(raw) => raw,
        };

        let loaded = serde_json::from_value::<CalibrationProfile>(raw)
            .map_err(Error::from)
            .and_then(|profile| profile.validate().map(|()| profile));

        let reply = match loaded {
            Ok(profile) => {
                self.analyzer.set_profile(Some(profile));
                ProfileLoaded {
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "client profile rejected");
                ProfileLoaded {
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };
        Some(ServerMessage::ProfileLoaded(reply))
    }

    fn calibrate(&mut self, landmarks: &Map<String, Value>) -> ServerMessage {
        if landmarks.is_empty() {
            return ServerMessage::calibration_warning("No landmarks detected");
        }
        let frame = sanitize::parse_frame(landmarks, self.config.limits.max_landmark_index);
        if frame.is_empty() {
            return ServerMessage::calibration_warning("Invalid landmark data");
        }

        let feedback = self.calibrator.add_frame(&frame);
        if !self.calibrator.is_complete() {
            return ServerMessage::CalibrationProgress(CalibrationProgressData {
                instruction: feedback.instruction,
                is_collecting: feedback.accepted,
                count: self.calibrator.frame_count(),
                total: self.calibrator.config().required_frames,
            });
        }

        match self.calibrator.finalize() {
            Ok(profile) => {
                self.analyzer.set_profile(Some(profile.clone()));
                tracing::info!(body_size = profile.baseline_body_size, "calibration complete");
                ServerMessage::CalibrationComplete { profile }
            }
            Err(e) => {
                self.calibrator.reset();
                ServerMessage::calibration_warning(format!("Calibration error: {e}"))
            }
        }
    }

    fn process(&mut self, landmarks: &Map<String, Value>, now: Timestamp) -> Vec<ServerMessage> {
        if landmarks.is_empty() || !self.session.is_active() {
            return Vec::new();
        }
        let frame = sanitize::parse_frame(landmarks, self.config.limits.max_landmark_index);
        if frame.is_empty() {
            return Vec::new();
        }

        let analysis = self.analyzer.analyze(&frame);
        let score = sanitize::clamp_score(analysis.score);
        let status = self.analyzer.get_status_with_hysteresis(score);
        self.session.update_stats(status, score);
        self.session.record_issues(&analysis.issues);

        let mut replies = Vec::with_capacity(2);

        let decision = self.analyzer.check_alert_condition_at(now);
        if decision.should_alert {
            let message = analysis
                .issues
                .first()
                .map(|issue| issue.advice.clone())
                .unwrap_or_else(|| FALLBACK_ALERT_MESSAGE.to_string());
            tracing::debug!(score, "posture alert");
            replies.push(ServerMessage::Alert {
                message,
                play_sound: decision.play_sound && self.audio_enabled,
            });
        }

        replies.push(ServerMessage::Metrics(MetricsData {
            status,
            score,
            current_issues: analysis.issues,
            session_stats: SessionStats {
                good_time_minutes: round1(self.session.good_time_secs() / 60.0),
                bad_time_minutes: round1(self.session.bad_time_secs() / 60.0),
            },
        }));
        replies
    }

    async fn stop_session(&mut self, now: Timestamp) -> Option<ServerMessage> {
        if !self.session.is_active() {
            tracing::debug!("stop requested without an active session");
            return None;
        }
        let summary = self.finish_session(now).ok()?;

        let save_error = match self.store.save_session(&summary).await {
            Ok(SaveOutcome::Saved) => None,
            Ok(SaveOutcome::AlreadySaved) => {
                tracing::debug!(session_id = %summary.session_id, "session was already stored");
                None
            }
            Err(e) => {
                tracing::warn!(session_id = %summary.session_id, error = %e, "session save failed");
                self.unsaved.push(summary.clone());
                Some(e.to_string())
            }
        };

        Some(ServerMessage::SessionStopped(SessionStopped {
            summary,
            save_error,
        }))
    }

    fn finish_session(&mut self, now: Timestamp) -> Result<SessionSummary> {
        let mut summary = self.session.stop_at(now.to_datetime())?;
        summary.total_logs = summary
            .total_logs
            .min(self.config.limits.max_logs_per_session);
        Ok(summary)
    }

    async fn log_posture(&mut self, score: &Value, status: &Value, issues: &Value) -> Result<()> {
        let Some(session_id) = self.session.session_id().filter(|_| self.session.is_active())
        else {
            return Ok(());
        };
        if self.session.log_count() >= self.config.limits.max_logs_per_session {
            tracing::debug!(%session_id, "log limit reached");
            return Ok(());
        }

        let record = PostureLogRecord::new(
            session_id,
            sanitize::sanitize_status(status),
            sanitize::sanitize_score(score),
            sanitize::sanitize_issues(issues, self.config.limits.max_issues_per_log),
        );
        self.store.save_log(&record).await?;
        self.session.record_log();
        Ok(())
    }
}
