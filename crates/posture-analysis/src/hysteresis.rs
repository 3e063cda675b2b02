//! Flicker-free posture status.

use posture_core::PostureStatus;

use crate::config::AnalyzerConfig;

/// Holds the displayed status until a new one is requested on consecutive frames
#[derive(Debug, Clone)]
pub struct StatusHysteresis {
    good_threshold: f64,
    warning_threshold: f64,
    hold_frames: u32,
    current: PostureStatus,
    pending: Option<PostureStatus>,
    pending_count: u32,
}

impl StatusHysteresis {
    pub fn new(good_threshold: f64, warning_threshold: f64, hold_frames: u32) -> Self {
        Self {
            good_threshold,
            warning_threshold,
            hold_frames: hold_frames.max(1),
            current: PostureStatus::Good,
            pending: None,
            pending_count: 0,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            config.good_threshold,
            config.warning_threshold,
            config.status_hold_frames,
        )
    }

    /// Unstabilized bucket for a score
    pub fn raw_status(&self, score: f64) -> PostureStatus {
        if score >= self.good_threshold {
            PostureStatus::Good
        } else if score >= self.warning_threshold {
            PostureStatus::Warning
        } else {
            PostureStatus::Bad
        }
    }

    pub fn update(&mut self, score: f64) -> PostureStatus {
        let requested = self.raw_status(score);

        if requested == self.current {
            self.pending = None;
            self.pending_count = 0;
            return self.current;
        }

        if self.pending == Some(requested) {
            self.pending_count += 1;
        } else {
            self.pending = Some(requested);
            self.pending_count = 1;
        }

        if self.pending_count >= self.hold_frames {
            tracing::debug!(from = ?self.current, to = ?requested, "posture status changed");
            self.current = requested;
            self.pending = None;
            self.pending_count = 0;
        }

        self.current
    }

    pub fn current(&self) -> PostureStatus {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = PostureStatus::Good;
        self.pending = None;
        self.pending_count = 0;
    }
}

impl Default for StatusHysteresis {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}
