//! Personal baseline capture.
//!
//! The calibrator collects first and filters later: every frame with a usable
//! head-and-shoulders subset is kept together with its quality score, and
//! [`Calibrator::finalize`] derives the baseline from medians over the best
//! frames only.

use chrono::Utc;
use posture_core::{
    angle_at, median, BodyRole, CalibrationProfile, Error, Frame, LandmarkResolver, Result,
};
use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::features::{FeatureExtractor, PoseFeatures};

/// Hips must be at least this confident to contribute a torso angle
const HIP_VISIBILITY: f64 = 0.3;

/// Torso angle used when no calibration frame shows both hips
pub const DEFAULT_SHOULDER_HIP_ANGLE: f64 = 170.0;

/// Frames above this quality get the "hold still" prompt
const PERFECT_QUALITY: f64 = 0.85;

const LATERAL_HINT: f64 = 0.2;
const FORWARD_HINT: f64 = 0.3;
const SHOULDER_TILT_HINT: f64 = 0.1;
const HEAD_TILT_HINT: f64 = 0.1;

pub const NOT_VISIBLE_INSTRUCTION: &str =
    "Position yourself so your head and shoulders are visible";

/// Result of offering one frame to the calibrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFeedback {
    /// The frame was collected
    pub accepted: bool,
    /// User-facing guidance for the next frames
    pub instruction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub count: usize,
    pub total: usize,
    pub percent: f64,
}

#[derive(Debug, Clone)]
struct CollectedFrame {
    frame: Frame,
    features: PoseFeatures,
    quality: f64,
}

/// Calibration state machine: collecting until finalized, then empty again
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    config: CalibrationConfig,
    extractor: FeatureExtractor,
    collected: Vec<CollectedFrame>,
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CalibrationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Offer a frame for calibration
    pub fn add_frame(&mut self, frame: &Frame) -> CalibrationFeedback {
        let Some(features) = self.extractor.extract(frame) else {
            tracing::debug!(landmarks = frame.len(), "calibration frame rejected");
            return CalibrationFeedback {
                accepted: false,
                instruction: NOT_VISIBLE_INSTRUCTION.to_string(),
            };
        };

        let quality = features.quality();
        self.collected.push(CollectedFrame {
            frame: frame.clone(),
            features,
            quality,
        });

        tracing::trace!(
            count = self.collected.len(),
            quality,
            estimated = features.shoulders_estimated,
            "calibration frame collected"
        );

        CalibrationFeedback {
            accepted: true,
            instruction: self.instruction(&features, quality),
        }
    }

    fn instruction(&self, features: &PoseFeatures, quality: f64) -> String {
        let count = self.collected.len();
        let total = self.config.required_frames;

        if quality > PERFECT_QUALITY {
            return format!("Perfect! Hold still... ({count}/{total})");
        }

        // Most important correction first
        if features.head_lateral.abs() > LATERAL_HINT {
            let direction = if features.head_lateral > 0.0 { "left" } else { "right" };
            return format!("Center your head (move {direction})");
        }
        if features.head_forward > FORWARD_HINT {
            return "Sit up straighter".to_string();
        }
        if features.shoulder_tilt.abs() > SHOULDER_TILT_HINT {
            let side = if features.shoulder_tilt > 0.0 { "left" } else { "right" };
            return format!("Level your shoulders ({side} is higher)");
        }
        if features.head_tilt.abs() > HEAD_TILT_HINT {
            let side = if features.head_tilt > 0.0 { "left" } else { "right" };
            return format!("Straighten your head ({side} tilt)");
        }

        format!("Good! Keep still... ({count}/{total})")
    }

    pub fn is_complete(&self) -> bool {
        self.collected.len() >= self.config.required_frames
    }

    pub fn frame_count(&self) -> usize {
        self.collected.len()
    }

    pub fn progress(&self) -> CalibrationProgress {
        let count = self.collected.len();
        let total = self.config.required_frames;
        let percent = if total == 0 {
            100.0
        } else {
            count as f64 / total as f64 * 100.0
        };
        CalibrationProgress {
            count,
            total,
            percent,
        }
    }

    /// Derive the profile from the best collected frames and clear the buffer
    pub fn finalize(&mut self) -> Result<CalibrationProfile> {
        if self.collected.is_empty() {
            return Err(Error::EmptyCalibration);
        }

        let mut frames = std::mem::take(&mut self.collected);
        // Stable sort keeps arrival order among equal-quality frames
        frames.sort_by(|a, b| b.quality.total_cmp(&a.quality));
        frames.truncate(self.config.usable_frames.max(1));

        let feature = |f: fn(&PoseFeatures) -> f64| -> Vec<f64> {
            frames.iter().map(|c| f(&c.features)).collect()
        };
        let med = |values: Vec<f64>| median(&values).ok_or(Error::EmptyCalibration);

        let head_forward = med(feature(|f| f.head_forward))?;
        let shoulder_tilt = med(feature(|f| f.shoulder_tilt))?;
        let body_size = med(feature(|f| f.shoulder_width))?;
        let shoulder_y = med(feature(|f| f.shoulder_y))?;
        let head_lateral = med(feature(|f| f.head_lateral))?;

        let ear_shoulder = med(frames.iter().map(|c| ear_shoulder_angle(&c.features)).collect())?;

        let hip_angles: Vec<f64> = frames
            .iter()
            .filter_map(|c| shoulder_hip_angle(&c.frame, &c.features))
            .collect();
        let shoulder_hip = median(&hip_angles).unwrap_or(DEFAULT_SHOULDER_HIP_ANGLE);

        let profile = CalibrationProfile {
            created_at: Utc::now(),
            ideal_ear_shoulder_angle: ear_shoulder,
            ideal_shoulder_hip_angle: shoulder_hip,
            baseline_shoulder_height: shoulder_y,
            baseline_head_distance: head_lateral.abs(),
            baseline_body_size: body_size,
            baseline_head_forward: head_forward,
            baseline_shoulder_tilt: shoulder_tilt,
        };

        tracing::info!(
            used = frames.len(),
            hip_frames = hip_angles.len(),
            body_size,
            ear_shoulder,
            shoulder_hip,
            "calibration finalized"
        );

        Ok(profile)
    }

    pub fn reset(&mut self) {
        self.collected.clear();
    }
}

/// Angle at the head center between vertical and the shoulder midpoint
fn ear_shoulder_angle(features: &PoseFeatures) -> f64 {
    let head = features.head_center();
    angle_at(head.above(), head, features.shoulder_center())
}

/// Mean of left and right torso angles, if both hips are confidently visible
fn shoulder_hip_angle(frame: &Frame, features: &PoseFeatures) -> Option<f64> {
    let (left_hip, right_hip) = LandmarkResolver::new(HIP_VISIBILITY).resolve_pair(
        frame,
        BodyRole::LeftHip,
        BodyRole::RightHip,
    )?;

    let left_sh = features.left_shoulder;
    let right_sh = features.right_shoulder;
    let left = angle_at(left_sh.above(), left_sh, left_hip);
    let right = angle_at(right_sh.above(), right_sh, right_hip);
    Some((left + right) / 2.0)
}
