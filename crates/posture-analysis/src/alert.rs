//! Sustained-bad-posture alert timer.
//!
//! The timer starts on the first smoothed score below the trigger threshold
//! and is only cleared once the score climbs back to the recovery level.
//! Scores between the two thresholds leave the timer running.

use posture_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::config::AlertConfig;

/// Outcome of one alert check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub should_alert: bool,
    pub play_sound: bool,
}

impl AlertDecision {
    const NONE: Self = Self {
        should_alert: false,
        play_sound: false,
    };
}

#[derive(Debug, Clone)]
pub struct AlertMonitor {
    config: AlertConfig,
    bad_since: Option<Timestamp>,
    triggered: bool,
}

impl AlertMonitor {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            bad_since: None,
            triggered: false,
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Start of the current bad-posture episode, if one is running
    pub fn bad_since(&self) -> Option<Timestamp> {
        self.bad_since
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn check(&mut self, smoothed: f64, now: Timestamp) -> AlertDecision {
        if smoothed < self.config.trigger_below {
            let Some(start) = self.bad_since else {
                tracing::debug!(score = smoothed, "bad posture timer started");
                self.bad_since = Some(now);
                return AlertDecision::NONE;
            };

            let elapsed = now.secs_since(start);
            if elapsed >= self.config.arm_after_secs() {
                if !self.triggered {
                    self.triggered = true;
                    tracing::info!(elapsed, score = smoothed, "posture alert fired");
                    return AlertDecision {
                        should_alert: true,
                        play_sound: true,
                    };
                }
                // Repeat window is wall-clock modulo; irregular ticks may refire within it
                return AlertDecision {
                    should_alert: elapsed % self.config.repeat_interval_secs < 1.0,
                    play_sound: false,
                };
            }
        } else if self.bad_since.is_some() && smoothed >= self.config.recover_at {
            tracing::debug!(score = smoothed, "posture recovered, alert cleared");
            self.reset();
        }

        AlertDecision::NONE
    }

    pub fn reset(&mut self) {
        self.bad_since = None;
        self.triggered = false;
    }
}

impl Default for AlertMonitor {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
