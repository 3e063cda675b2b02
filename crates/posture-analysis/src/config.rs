//! Tunables for calibration and analysis.

use serde::{Deserialize, Serialize};

/// Calibration capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Frames collected before calibration is considered complete
    pub required_frames: usize,
    /// Highest-quality frames kept for the baseline statistics
    pub usable_frames: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            required_frames: 20,
            usable_frames: 10,
        }
    }
}

/// Sustained-bad-posture alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Seconds of bad posture before an alert may fire
    pub consecutive_bad_seconds: f64,
    /// Extra grace period added on top of `consecutive_bad_seconds`
    pub arm_buffer_secs: f64,
    /// Smoothed score below which the bad-posture timer runs
    pub trigger_below: f64,
    /// Smoothed score needed to clear the timer
    pub recover_at: f64,
    /// Window for repeat (silent) alerts while posture stays bad
    pub repeat_interval_secs: f64,
}

impl AlertConfig {
    /// Seconds of bad posture after which the first alert fires
    pub fn arm_after_secs(&self) -> f64 {
        self.consecutive_bad_seconds + self.arm_buffer_secs
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            consecutive_bad_seconds: 5.0,
            arm_buffer_secs: 2.0,
            trigger_below: 7.0,
            recover_at: 8.0,
            repeat_interval_secs: 30.0,
        }
    }
}

/// Per-frame analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Raw scores retained for smoothing (~2 s at 5 fps)
    pub history_size: usize,
    /// EMA weight of the newest raw score
    pub ema_alpha: f64,
    /// Samples required before the EMA engages
    pub ema_warmup: usize,
    pub good_threshold: f64,
    pub warning_threshold: f64,
    /// Consecutive frames required to commit a status change
    pub status_hold_frames: u32,
    pub alert: AlertConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            history_size: 10,
            ema_alpha: 0.5,
            ema_warmup: 3,
            good_threshold: 7.0,
            warning_threshold: 5.0,
            status_hold_frames: 2,
            alert: AlertConfig::default(),
        }
    }
}
