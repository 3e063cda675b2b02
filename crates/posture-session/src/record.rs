//! Per-frame posture log records.

use chrono::{DateTime, Utc};
use posture_core::{PostureIssue, PostureMetrics, PostureStatus, SessionId};
use serde::{Deserialize, Serialize};

/// Issues retained per log record
pub const MAX_LOGGED_ISSUES: usize = 10;

pub const MAX_ISSUE_TYPE_CHARS: usize = 50;
pub const MAX_SEVERITY_CHARS: usize = 20;
pub const MAX_ADVICE_CHARS: usize = 200;

/// Client-reported issue, reduced to bounded free-text fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: String,
    pub advice: String,
}

impl LoggedIssue {
    pub fn new(issue_type: &str, severity: &str, advice: &str) -> Self {
        Self {
            issue_type: truncate_chars(issue_type, MAX_ISSUE_TYPE_CHARS),
            severity: truncate_chars(severity, MAX_SEVERITY_CHARS),
            advice: truncate_chars(advice, MAX_ADVICE_CHARS),
        }
    }
}

impl From<&PostureIssue> for LoggedIssue {
    fn from(issue: &PostureIssue) -> Self {
        Self::new(
            issue.issue_type.as_str(),
            issue.severity.as_str(),
            &issue.advice,
        )
    }
}

/// One stored snapshot of the user's posture during a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureLogRecord {
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub status: PostureStatus,
    pub score: f64,
    pub issues: Vec<LoggedIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PostureMetrics>,
}

impl PostureLogRecord {
    /// Build a record stamped now, keeping at most [`MAX_LOGGED_ISSUES`] issues
    pub fn new(
        session_id: SessionId,
        status: PostureStatus,
        score: f64,
        issues: impl IntoIterator<Item = LoggedIssue>,
    ) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            status,
            score,
            issues: issues.into_iter().take(MAX_LOGGED_ISSUES).collect(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PostureMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Prefix of at most `max` characters, never splitting a code point
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
