//! JSON messages exchanged with a monitoring client.
//!
//! Inbound payloads are kept loosely typed (`serde_json::Value`) where clients
//! are known to send junk; [`crate::sanitize`] turns them into core types.

use posture_core::{CalibrationProfile, PostureIssue, PostureStatus, SessionId};
use posture_session::SessionSummary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Client → server ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Profile previously stored client-side
    SetProfile {
        #[serde(default)]
        profile: Option<Value>,
    },
    CalibrateLandmarks {
        #[serde(default)]
        landmarks: Map<String, Value>,
    },
    ProcessLandmarks {
        #[serde(default)]
        landmarks: Map<String, Value>,
    },
    StartSession,
    StopSession,
    ToggleAudio {
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
    /// Client-measured good/bad seconds for the active session
    UpdateSessionStats {
        #[serde(default)]
        good_time_sec: Value,
        #[serde(default)]
        bad_time_sec: Value,
    },
    LogPosture {
        #[serde(default)]
        score: Value,
        #[serde(default)]
        status: Value,
        #[serde(default)]
        issues: Value,
    },
    Pong,
}

fn default_enabled() -> bool {
    true
}

// --- Server → client ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    ProfileLoaded(ProfileLoaded),
    CalibrationWarning { message: String },
    CalibrationProgress(CalibrationProgressData),
    CalibrationComplete { profile: CalibrationProfile },
    Metrics(MetricsData),
    Alert { message: String, play_sound: bool },
    SessionStarted { session_id: SessionId },
    SessionStopped(SessionStopped),
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileLoaded {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgressData {
    pub instruction: String,
    pub is_collecting: bool,
    pub count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsData {
    pub status: PostureStatus,
    pub score: f64,
    pub current_issues: Vec<PostureIssue>,
    pub session_stats: SessionStats,
}

/// Tracked time so far, in minutes rounded to one decimal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub good_time_minutes: f64,
    pub bad_time_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStopped {
    #[serde(flatten)]
    pub summary: SessionSummary,
    /// Present when the summary could not be persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

impl ServerMessage {
    pub fn calibration_warning(message: impl Into<String>) -> Self {
        ServerMessage::CalibrationWarning {
            message: message.into(),
        }
    }

    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::ProfileLoaded(_) => "profile_loaded",
            ServerMessage::CalibrationWarning { .. } => "calibration_warning",
            ServerMessage::CalibrationProgress(_) => "calibration_progress",
            ServerMessage::CalibrationComplete { .. } => "calibration_complete",
            ServerMessage::Metrics(_) => "metrics",
            ServerMessage::Alert { .. } => "alert",
            ServerMessage::SessionStarted { .. } => "session_started",
            ServerMessage::SessionStopped(_) => "session_stopped",
            ServerMessage::Ping => "ping",
        }
    }
}
