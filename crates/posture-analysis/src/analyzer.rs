//! Per-connection posture analyzer orchestrating metrics, scoring and feedback.

use posture_core::{
    angle_at, round1, BodyRole, CalibrationProfile, Frame, LandmarkResolver, PostureIssue,
    PostureMetrics, PostureStatus, Result, Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertDecision, AlertMonitor};
use crate::config::AnalyzerConfig;
use crate::hysteresis::StatusHysteresis;
use crate::scoring::{score_metrics, ScoreReport};
use crate::smoothing::ScoreSmoother;

/// Hips at or below this confidence are ignored for the slouch angle
const HIP_VISIBILITY: f64 = 0.3;

/// Shoulder-height fallback for slouch, in degree-equivalents per normalized unit.
/// Unvalidated heuristic; the scale does not match the angle path.
const SLOUCH_HEIGHT_SCALE: f64 = 50.0;

/// Result of analyzing one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub metrics: PostureMetrics,
    /// Smoothed score rounded to one decimal
    pub score: f64,
    pub issues: Vec<PostureIssue>,
    /// Unsmoothed weighted score; `None` when required landmarks were missing
    pub raw_score: Option<f64>,
}

/// Streaming posture analyzer.
///
/// Owns all temporal state for one client: the score smoother, the displayed
/// status and the alert timer. Swapping the profile leaves that state intact.
#[derive(Debug, Clone)]
pub struct PostureAnalyzer {
    config: AnalyzerConfig,
    profile: Option<CalibrationProfile>,
    smoother: ScoreSmoother,
    status: StatusHysteresis,
    alert: AlertMonitor,
}

impl PostureAnalyzer {
    pub fn new(profile: Option<CalibrationProfile>) -> Self {
        Self::with_config(profile, AnalyzerConfig::default())
    }

    pub fn with_config(profile: Option<CalibrationProfile>, config: AnalyzerConfig) -> Self {
        Self {
            smoother: ScoreSmoother::from_config(&config),
            status: StatusHysteresis::from_config(&config),
            alert: AlertMonitor::new(config.alert.clone()),
            profile,
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn profile(&self) -> Option<&CalibrationProfile> {
        self.profile.as_ref()
    }

    pub fn set_profile(&mut self, profile: Option<CalibrationProfile>) {
        tracing::debug!(calibrated = profile.is_some(), "analyzer profile replaced");
        self.profile = profile;
    }

    /// Current smoothed score, unrounded
    pub fn smoothed_score(&self) -> f64 {
        self.smoother.current()
    }

    /// Analyze one frame and advance the smoother
    pub fn analyze(&mut self, frame: &Frame) -> FrameAnalysis {
        let metrics = match self.try_compute_metrics(frame) {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::trace!(landmarks = frame.len(), error = %e, "frame skipped");
                return FrameAnalysis {
                    metrics: PostureMetrics::default(),
                    score: round1(self.smoother.current()),
                    issues: Vec::new(),
                    raw_score: None,
                };
            }
        };

        let report = self.score_metrics(&metrics);
        let smoothed = self.smoother.push(report.raw_score);

        FrameAnalysis {
            metrics,
            score: round1(smoothed),
            issues: report.issues,
            raw_score: Some(report.raw_score),
        }
    }

    /// Raw deviations for a frame, or `None` if a required landmark is absent
    pub fn compute_metrics(&self, frame: &Frame) -> Option<PostureMetrics> {
        self.try_compute_metrics(frame).ok()
    }

    /// Raw deviations for a frame; the error names the first missing landmark role.
    ///
    /// Nose, ears and shoulders are used whatever their visibility.
    pub fn try_compute_metrics(&self, frame: &Frame) -> Result<PostureMetrics> {
        let present = LandmarkResolver::any_visibility();
        let nose = present.require(frame, BodyRole::Nose)?;
        let left_ear = present.require(frame, BodyRole::LeftEar)?;
        let right_ear = present.require(frame, BodyRole::RightEar)?;
        let left_sh = present.require(frame, BodyRole::LeftShoulder)?;
        let right_sh = present.require(frame, BodyRole::RightShoulder)?;

        let shoulder_y = (left_sh.y + right_sh.y) / 2.0;

        let hips = LandmarkResolver::new(HIP_VISIBILITY).resolve_pair(
            frame,
            BodyRole::LeftHip,
            BodyRole::RightHip,
        );
        let mut slouch = 0.0;
        if let (Some(profile), Some((left_hip, right_hip))) = (&self.profile, hips) {
            let left = angle_at(left_sh.above(), left_sh, left_hip);
            let right = angle_at(right_sh.above(), right_sh, right_hip);
            slouch = ((left + right) / 2.0 - profile.ideal_shoulder_hip_angle).abs();
        }
        if slouch == 0.0 {
            if let Some(profile) = &self.profile {
                slouch = (shoulder_y - profile.baseline_shoulder_height).abs() * SLOUCH_HEIGHT_SCALE;
            }
        }

        let shoulder_width = (left_sh.x - right_sh.x).abs();
        let screen_distance_change = match &self.profile {
            Some(p) if p.baseline_body_size > 0.0 => {
                (shoulder_width - p.baseline_body_size).abs() / p.baseline_body_size * 100.0
            }
            _ => 0.0,
        };

        Ok(PostureMetrics {
            forward_head_distance: nose.y - shoulder_y,
            shoulder_asymmetry: (left_sh.y - right_sh.y).abs(),
            slouch_angle: slouch,
            neck_tilt_angle: (left_ear.y - right_ear.y).abs() * 100.0,
            screen_distance_change,
        })
    }

    /// Weighted score and issues; perfect when no profile is loaded
    pub fn score_metrics(&self, metrics: &PostureMetrics) -> ScoreReport {
        if self.profile.is_none() {
            return ScoreReport::perfect();
        }
        score_metrics(metrics)
    }

    pub fn get_status_with_hysteresis(&mut self, score: f64) -> PostureStatus {
        self.status.update(score)
    }

    pub fn current_status(&self) -> PostureStatus {
        self.status.current()
    }

    /// Alert decision for the current smoothed score at wall-clock now
    pub fn check_alert_condition(&mut self) -> AlertDecision {
        self.check_alert_condition_at(Timestamp::now())
    }

    pub fn check_alert_condition_at(&mut self, now: Timestamp) -> AlertDecision {
        self.alert.check(self.smoother.current(), now)
    }

    /// Forget all temporal state, keeping the profile
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.status.reset();
        self.alert.reset();
    }
}

impl Default for PostureAnalyzer {
    fn default() -> Self {
        Self::new(None)
    }
}
