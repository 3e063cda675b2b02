//! Anatomical role lookup with ordered landmark fallbacks.

use crate::error::{Error, Result};
use crate::geometry::Point2D;
use crate::types::{Frame, Landmark, LandmarkIndex};

/// Minimum visibility for a landmark to be used by the resolver
pub const DEFAULT_MIN_VISIBILITY: f64 = 0.1;

/// Body parts the pipeline asks for, each backed by one or more landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRole {
    Nose,
    LeftShoulder,
    RightShoulder,
    /// Ear, falling back to the outer eye corner
    LeftHeadReference,
    RightHeadReference,
    LeftEar,
    RightEar,
    LeftHip,
    RightHip,
}

impl BodyRole {
    /// Landmarks tried in order for this role
    pub fn candidates(&self) -> &'static [LandmarkIndex] {
        match self {
            BodyRole::Nose => &[LandmarkIndex::Nose],
            BodyRole::LeftShoulder => &[LandmarkIndex::LeftShoulder],
            BodyRole::RightShoulder => &[LandmarkIndex::RightShoulder],
            BodyRole::LeftHeadReference => &[LandmarkIndex::LeftEar, LandmarkIndex::LeftEyeOuter],
            BodyRole::RightHeadReference => {
                &[LandmarkIndex::RightEar, LandmarkIndex::RightEyeOuter]
            }
            BodyRole::LeftEar => &[LandmarkIndex::LeftEar],
            BodyRole::RightEar => &[LandmarkIndex::RightEar],
            BodyRole::LeftHip => &[LandmarkIndex::LeftHip],
            BodyRole::RightHip => &[LandmarkIndex::RightHip],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BodyRole::Nose => "nose",
            BodyRole::LeftShoulder => "left shoulder",
            BodyRole::RightShoulder => "right shoulder",
            BodyRole::LeftHeadReference => "left ear/eye",
            BodyRole::RightHeadReference => "right ear/eye",
            BodyRole::LeftEar => "left ear",
            BodyRole::RightEar => "right ear",
            BodyRole::LeftHip => "left hip",
            BodyRole::RightHip => "right hip",
        }
    }
}

/// Resolves body roles against a frame, skipping low-confidence landmarks
#[derive(Debug, Clone, Copy)]
pub struct LandmarkResolver {
    pub min_visibility: f64,
}

impl Default for LandmarkResolver {
    fn default() -> Self {
        Self {
            min_visibility: DEFAULT_MIN_VISIBILITY,
        }
    }
}

impl LandmarkResolver {
    pub fn new(min_visibility: f64) -> Self {
        Self { min_visibility }
    }

    /// Accepts every landmark present in the frame, whatever its visibility
    pub fn any_visibility() -> Self {
        Self {
            min_visibility: f64::NEG_INFINITY,
        }
    }

    pub fn resolve_landmark<'a>(&self, frame: &'a Frame, role: BodyRole) -> Option<&'a Landmark> {
        role.candidates()
            .iter()
            .filter_map(|idx| frame.get(*idx))
            .find(|lm| lm.is_visible(self.min_visibility))
    }

    pub fn resolve(&self, frame: &Frame, role: BodyRole) -> Option<Point2D> {
        self.resolve_landmark(frame, role).map(Landmark::point)
    }

    /// Resolve a role or report which one is missing
    pub fn require(&self, frame: &Frame, role: BodyRole) -> Result<Point2D> {
        self.resolve(frame, role)
            .ok_or(Error::InsufficientLandmarks { role: role.name() })
    }

    /// Resolve a left/right pair; both sides must be present
    pub fn resolve_pair(
        &self,
        frame: &Frame,
        left: BodyRole,
        right: BodyRole,
    ) -> Option<(Point2D, Point2D)> {
        Some((self.resolve(frame, left)?, self.resolve(frame, right)?))
    }
}
