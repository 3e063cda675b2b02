//! Session lifecycle and final grading.

use chrono::{DateTime, Utc};
use posture_core::{round1, Error, PostureIssue, PostureIssueType, PostureStatus, Result, SessionId};
use serde::{Deserialize, Serialize};

/// Issue types listed in a summary
pub const MOST_COMMON_ISSUES: usize = 3;

/// Share of the grade taken by good-posture time; the rest comes from the average score
const TIME_WEIGHT: f64 = 0.6;
const SCORE_WEIGHT: f64 = 0.4;

/// Final report for one monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: f64,
    pub good_time_minutes: f64,
    pub bad_time_minutes: f64,
    /// Rounded to one decimal
    pub good_posture_percentage: f64,
    /// Combined 0-10 grade, rounded to one decimal
    #[serde(rename = "average_score")]
    pub grade: f64,
    pub total_logs: u64,
    #[serde(default)]
    pub most_common_issues: Vec<PostureIssueType>,
}

/// Accumulates statistics while a session is active.
///
/// Good/bad time is supplied by the client; this type never reads a clock
/// except to stamp start and end.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    session_id: Option<SessionId>,
    start_time: Option<DateTime<Utc>>,
    active: bool,
    good_time_secs: f64,
    bad_time_secs: f64,
    score_sum: f64,
    frame_count: u64,
    status_frames: [u64; 3],
    log_count: u64,
    /// Issue tallies in first-seen order
    issue_counts: Vec<(PostureIssueType, u64)>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session, discarding any previous counters
    pub fn start(&mut self) -> SessionId {
        self.start_at(Utc::now())
    }

    pub fn start_at(&mut self, now: DateTime<Utc>) -> SessionId {
        if let Some(previous) = self.session_id.filter(|_| self.active) {
            tracing::warn!(%previous, "restarting while a session is active");
        }

        let id = SessionId::new();
        *self = Self {
            session_id: Some(id),
            start_time: Some(now),
            active: true,
            ..Self::default()
        };

        tracing::info!(session_id = %id, "session started");
        id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Count one analyzed frame; ignored while inactive
    pub fn update_stats(&mut self, status: PostureStatus, score: f64) {
        if !self.active {
            return;
        }
        self.score_sum += score;
        self.frame_count += 1;
        self.status_frames[status_slot(status)] += 1;
    }

    /// Replace the tracked good/bad seconds with client-measured values.
    ///
    /// Non-finite values are ignored and negatives clamp to zero.
    pub fn set_tracked_time(&mut self, good_secs: f64, bad_secs: f64) {
        if !self.active {
            return;
        }
        if good_secs.is_finite() {
            self.good_time_secs = good_secs.max(0.0);
        }
        if bad_secs.is_finite() {
            self.bad_time_secs = bad_secs.max(0.0);
        }
    }

    pub fn record_issues(&mut self, issues: &[PostureIssue]) {
        if !self.active {
            return;
        }
        for issue in issues {
            match self
                .issue_counts
                .iter_mut()
                .find(|(kind, _)| *kind == issue.issue_type)
            {
                Some((_, count)) => *count += 1,
                None => self.issue_counts.push((issue.issue_type, 1)),
            }
        }
    }

    /// Count one persisted log record
    pub fn record_log(&mut self) {
        if self.active {
            self.log_count += 1;
        }
    }

    pub fn log_count(&self) -> u64 {
        self.log_count
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frames_with_status(&self, status: PostureStatus) -> u64 {
        self.status_frames[status_slot(status)]
    }

    pub fn good_time_secs(&self) -> f64 {
        self.good_time_secs
    }

    pub fn bad_time_secs(&self) -> f64 {
        self.bad_time_secs
    }

    /// Mean analyzed score, 10 before any frame
    pub fn average_score(&self) -> f64 {
        if self.frame_count == 0 {
            10.0
        } else {
            self.score_sum / self.frame_count as f64
        }
    }

    /// Good share of tracked time in percent, 100 when nothing was tracked
    pub fn good_posture_percentage(&self) -> f64 {
        let tracked = self.good_time_secs + self.bad_time_secs;
        if tracked > 0.0 {
            self.good_time_secs / tracked * 100.0
        } else {
            100.0
        }
    }

    pub fn grade(&self) -> f64 {
        (self.good_posture_percentage() / 100.0 * 10.0) * TIME_WEIGHT
            + self.average_score() * SCORE_WEIGHT
    }

    pub fn most_common_issues(&self) -> Vec<PostureIssueType> {
        let mut ranked = self.issue_counts.clone();
        // Stable: ties stay in first-seen order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(MOST_COMMON_ISSUES)
            .map(|(kind, _)| kind)
            .collect()
    }

    /// End the session and produce its summary
    pub fn stop(&mut self) -> Result<SessionSummary> {
        self.stop_at(Utc::now())
    }

    pub fn stop_at(&mut self, end_time: DateTime<Utc>) -> Result<SessionSummary> {
        if !self.active {
            return Err(Error::NoActiveSession);
        }
        let (Some(session_id), Some(start_time)) = (self.session_id, self.start_time) else {
            return Err(Error::NoActiveSession);
        };
        self.active = false;

        let duration_secs = (end_time - start_time).num_milliseconds().max(0) as f64 / 1000.0;

        let summary = SessionSummary {
            session_id,
            start_time,
            end_time,
            duration_minutes: duration_secs / 60.0,
            good_time_minutes: self.good_time_secs / 60.0,
            bad_time_minutes: self.bad_time_secs / 60.0,
            good_posture_percentage: round1(self.good_posture_percentage()),
            grade: round1(self.grade()),
            total_logs: self.log_count,
            most_common_issues: self.most_common_issues(),
        };

        tracing::info!(
            session_id = %session_id,
            frames = self.frame_count,
            grade = summary.grade,
            good_pct = summary.good_posture_percentage,
            "session stopped"
        );

        Ok(summary)
    }
}

fn status_slot(status: PostureStatus) -> usize {
    match status {
        PostureStatus::Good => 0,
        PostureStatus::Warning => 1,
        PostureStatus::Bad => 2,
    }
}
