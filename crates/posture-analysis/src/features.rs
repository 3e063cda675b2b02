//! Scale-invariant pose features used during calibration.
//!
//! All positional features are divided by the shoulder width so that the
//! same posture yields the same numbers whether the user sits close to the
//! camera or far from it.

use posture_core::{BodyRole, Frame, LandmarkResolver, Point2D};
use serde::{Deserialize, Serialize};

/// Shoulder spans narrower than this are treated as a detection error
pub const MIN_SHOULDER_WIDTH: f64 = 0.05;

/// Shoulder span relative to head width when shoulders must be estimated
const SHOULDER_TO_HEAD_WIDTH: f64 = 2.2;

/// Vertical nose-to-shoulder drop relative to head width
const SHOULDER_DROP_TO_HEAD_WIDTH: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseFeatures {
    /// Nose below the shoulder line, in shoulder widths
    pub head_forward: f64,
    /// Nose right of the shoulder midpoint, in shoulder widths
    pub head_lateral: f64,
    /// Left minus right shoulder height, in shoulder widths
    pub shoulder_tilt: f64,
    /// Left minus right ear (or eye) height, in shoulder widths
    pub head_tilt: f64,
    pub shoulder_width: f64,
    /// Shoulder midpoint y
    pub shoulder_y: f64,
    pub nose_y: f64,
    pub left_shoulder: Point2D,
    pub right_shoulder: Point2D,
    pub left_head_reference: Point2D,
    pub right_head_reference: Point2D,
    /// Shoulders were inferred from head width rather than detected
    pub shoulders_estimated: bool,
}

impl PoseFeatures {
    pub fn shoulder_center(&self) -> Point2D {
        self.left_shoulder.midpoint(&self.right_shoulder)
    }

    pub fn head_center(&self) -> Point2D {
        self.left_head_reference.midpoint(&self.right_head_reference)
    }

    /// Frame quality in (0, 1]; independent multiplicative penalties
    pub fn quality(&self) -> f64 {
        let mut quality = 1.0;

        if self.head_lateral.abs() > 0.3 {
            quality *= 0.7;
        }
        if self.head_forward > 0.5 {
            quality *= 0.7;
        }
        if self.shoulder_tilt.abs() > 0.15 {
            quality *= 0.8;
        }
        if self.head_tilt.abs() > 0.15 {
            quality *= 0.8;
        }

        quality
    }
}

/// Extracts [`PoseFeatures`] from partial frames
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    resolver: LandmarkResolver,
}

impl FeatureExtractor {
    pub fn new(resolver: LandmarkResolver) -> Self {
        Self { resolver }
    }

    /// Returns `None` when the frame lacks a usable head-and-shoulders subset
    pub fn extract(&self, frame: &Frame) -> Option<PoseFeatures> {
        let nose = self.resolver.resolve(frame, BodyRole::Nose)?;
        let (left_sh, right_sh, estimated) = self.shoulders(frame, nose)?;
        let (left_ref, right_ref) = self.resolver.resolve_pair(
            frame,
            BodyRole::LeftHeadReference,
            BodyRole::RightHeadReference,
        )?;

        let shoulder_width = (left_sh.x - right_sh.x).abs();
        if shoulder_width < MIN_SHOULDER_WIDTH {
            return None;
        }

        let center = left_sh.midpoint(&right_sh);

        Some(PoseFeatures {
            head_forward: (nose.y - center.y) / shoulder_width,
            head_lateral: (nose.x - center.x) / shoulder_width,
            shoulder_tilt: (left_sh.y - right_sh.y) / shoulder_width,
            head_tilt: (left_ref.y - right_ref.y) / shoulder_width,
            shoulder_width,
            shoulder_y: center.y,
            nose_y: nose.y,
            left_shoulder: left_sh,
            right_shoulder: right_sh,
            left_head_reference: left_ref,
            right_head_reference: right_ref,
            shoulders_estimated: estimated,
        })
    }

    /// Detected shoulders, or an estimate from head width when either is missing
    fn shoulders(&self, frame: &Frame, nose: Point2D) -> Option<(Point2D, Point2D, bool)> {
        if let Some((left, right)) =
            self.resolver
                .resolve_pair(frame, BodyRole::LeftShoulder, BodyRole::RightShoulder)
        {
            return Some((left, right, false));
        }

        let (left_ref, right_ref) = self.resolver.resolve_pair(
            frame,
            BodyRole::LeftHeadReference,
            BodyRole::RightHeadReference,
        )?;

        let head_width = (left_ref.x - right_ref.x).abs();
        let center_x = (left_ref.x + right_ref.x) / 2.0;
        let shoulder_y = nose.y + head_width * SHOULDER_DROP_TO_HEAD_WIDTH;
        let half_span = head_width * SHOULDER_TO_HEAD_WIDTH / 2.0;
        // Keep each estimated shoulder on the same side as its ear
        let left_side = if left_ref.x >= right_ref.x { 1.0 } else { -1.0 };

        Some((
            Point2D::new(center_x + left_side * half_span, shoulder_y),
            Point2D::new(center_x - left_side * half_span, shoulder_y),
            true,
        ))
    }
}
