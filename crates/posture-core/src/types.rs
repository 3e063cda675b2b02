//! Fundamental types for the posture coaching pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::geometry::Point2D;

/// Monitoring session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Timestamp wrapper with nanosecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_nanos_opt().unwrap_or(0))
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1_000_000_000.0) as i64)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Seconds elapsed since `earlier` (negative if `earlier` is in the future)
    pub fn secs_since(&self, earlier: Timestamp) -> f64 {
        (self.0 as i128 - earlier.0 as i128) as f64 / 1_000_000_000.0
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0)
    }
}

/// 33-point body landmark definition (MediaPipe Pose topology)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub fn from_index(idx: u8) -> Option<Self> {
        use LandmarkIndex::*;
        const ALL: [LandmarkIndex; LandmarkIndex::COUNT] = [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye,
            RightEyeOuter, LeftEar, RightEar, MouthLeft, MouthRight, LeftShoulder,
            RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist, LeftPinky,
            RightPinky, LeftIndex, RightIndex, LeftThumb, RightThumb, LeftHip, RightHip,
            LeftKnee, RightKnee, LeftAnkle, RightAnkle, LeftHeel, RightHeel,
            LeftFootIndex, RightFootIndex,
        ];
        ALL.get(idx as usize).copied()
    }

    /// The anatomically opposite landmark (nose maps to itself)
    pub fn opposite(&self) -> Self {
        let idx = *self as u8;
        let mirrored = match idx {
            0 => 0,
            1..=3 => idx + 3,
            4..=6 => idx - 3,
            // Everything from the ears down alternates left (odd) / right (even)
            i if i % 2 == 1 => i + 1,
            i => i - 1,
        };
        Self::from_index(mirrored).unwrap_or(*self)
    }
}

/// One detected keypoint, normalized to the camera frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Detection confidence; browsers commonly omit it, which means "fully visible"
    pub fn visibility(&self) -> f64 {
        self.visibility.unwrap_or(1.0)
    }

    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility() > threshold
    }

    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// All landmarks observed at one instant. Unobserved indices are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    landmarks: BTreeMap<u8, Landmark>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from client-supplied, string-keyed landmark objects.
    ///
    /// Unknown indices and entries without numeric `x`/`y` are dropped.
    pub fn from_raw(raw: &serde_json::Map<String, serde_json::Value>) -> Self {
        let landmarks = raw
            .iter()
            .filter_map(|(key, value)| {
                let idx: u8 = key.trim().parse().ok()?;
                LandmarkIndex::from_index(idx)?;
                let landmark: Landmark = serde_json::from_value(value.clone()).ok()?;
                Some((idx, landmark))
            })
            .collect();
        Self { landmarks }
    }

    pub fn with(mut self, index: LandmarkIndex, landmark: Landmark) -> Self {
        self.insert(index, landmark);
        self
    }

    pub fn insert(&mut self, index: LandmarkIndex, landmark: Landmark) {
        self.landmarks.insert(index as u8, landmark);
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks.get(&(index as u8))
    }

    pub fn contains(&self, index: LandmarkIndex) -> bool {
        self.landmarks.contains_key(&(index as u8))
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkIndex, &Landmark)> {
        self.landmarks
            .iter()
            .filter_map(|(idx, lm)| LandmarkIndex::from_index(*idx).map(|i| (i, lm)))
    }

    /// Horizontally mirrored copy: left/right labels swapped, x reflected around 0.5
    pub fn mirrored(&self) -> Self {
        let landmarks = self
            .iter()
            .map(|(idx, lm)| {
                let mut flipped = *lm;
                flipped.x = 1.0 - lm.x;
                (idx.opposite() as u8, flipped)
            })
            .collect();
        Self { landmarks }
    }
}

impl FromIterator<(LandmarkIndex, Landmark)> for Frame {
    fn from_iter<T: IntoIterator<Item = (LandmarkIndex, Landmark)>>(iter: T) -> Self {
        Self {
            landmarks: iter.into_iter().map(|(i, lm)| (i as u8, lm)).collect(),
        }
    }
}

/// Personalized baseline geometry produced by calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub created_at: DateTime<Utc>,
    /// Degrees
    pub ideal_ear_shoulder_angle: f64,
    /// Degrees
    pub ideal_shoulder_hip_angle: f64,
    /// Normalized y of the shoulder midpoint
    pub baseline_shoulder_height: f64,
    /// Absolute lateral head offset, in shoulder widths
    pub baseline_head_distance: f64,
    /// Shoulder width, normalized
    pub baseline_body_size: f64,
    #[serde(default)]
    pub baseline_head_forward: f64,
    #[serde(default)]
    pub baseline_shoulder_tilt: f64,
}

impl CalibrationProfile {
    /// Checks the invariants a profile received from outside must hold
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("ideal_ear_shoulder_angle", self.ideal_ear_shoulder_angle),
            ("ideal_shoulder_hip_angle", self.ideal_shoulder_hip_angle),
            ("baseline_shoulder_height", self.baseline_shoulder_height),
            ("baseline_head_distance", self.baseline_head_distance),
            ("baseline_body_size", self.baseline_body_size),
            ("baseline_head_forward", self.baseline_head_forward),
            ("baseline_shoulder_tilt", self.baseline_shoulder_tilt),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidProfile(format!("{name} is not finite")));
        }
        if self.baseline_body_size <= 0.0 {
            return Err(Error::InvalidProfile(
                "baseline_body_size must be positive".into(),
            ));
        }
        if !(0.0..=180.0).contains(&self.ideal_shoulder_hip_angle) {
            return Err(Error::InvalidProfile(format!(
                "ideal_shoulder_hip_angle {} outside [0, 180]",
                self.ideal_shoulder_hip_angle
            )));
        }
        Ok(())
    }
}

/// Raw deviation measurements for one analyzed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PostureMetrics {
    /// Nose y minus shoulder midpoint y (positive = head dropped)
    pub forward_head_distance: f64,
    pub shoulder_asymmetry: f64,
    /// Deviation from the calibrated shoulder-hip angle
    pub slouch_angle: f64,
    /// Ear height difference, scaled by 100
    pub neck_tilt_angle: f64,
    /// Percent change in apparent shoulder width
    pub screen_distance_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureIssueType {
    ForwardHead,
    UnevenShoulders,
    Slouching,
    NeckTilt,
    ScreenDistance,
}

impl PostureIssueType {
    pub const ALL: [PostureIssueType; 5] = [
        PostureIssueType::ForwardHead,
        PostureIssueType::UnevenShoulders,
        PostureIssueType::Slouching,
        PostureIssueType::NeckTilt,
        PostureIssueType::ScreenDistance,
    ];

    /// Inverse of [`as_str`](Self::as_str); exact match only
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostureIssueType::ForwardHead => "forward_head",
            PostureIssueType::UnevenShoulders => "uneven_shoulders",
            PostureIssueType::Slouching => "slouching",
            PostureIssueType::NeckTilt => "neck_tilt",
            PostureIssueType::ScreenDistance => "screen_distance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Grade a dimension sub-score: mild >= 7, moderate >= 5, otherwise severe
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            Severity::Mild
        } else if score >= 5.0 {
            Severity::Moderate
        } else {
            Severity::Severe
        }
    }

    /// Sort key, most significant first
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Severe => 0,
            Severity::Moderate => 1,
            Severity::Mild => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureIssue {
    #[serde(rename = "type")]
    pub issue_type: PostureIssueType,
    pub severity: Severity,
    pub measurement: String,
    pub advice: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureStatus {
    #[default]
    Good,
    Warning,
    Bad,
}

impl PostureStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(PostureStatus::Good),
            "warning" => Some(PostureStatus::Warning),
            "bad" => Some(PostureStatus::Bad),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostureStatus::Good => "good",
            PostureStatus::Warning => "warning",
            PostureStatus::Bad => "bad",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_type_names() {
        for issue in PostureIssueType::ALL {
            assert_eq!(PostureIssueType::from_name(issue.as_str()), Some(issue));
        }
        assert_eq!(PostureIssueType::from_name("forward-head"), None);
    }

    #[test]
    fn test_secs_since_extreme_timestamps() {
        let early = Timestamp::from_secs_f64(-1e12);
        let late = Timestamp::from_secs_f64(1e12);
        // Both saturate to the i64 range; the difference must not overflow
        assert_eq!(early.0, i64::MIN);
        assert_eq!(late.0, i64::MAX);
        assert!(late.secs_since(early) > 1.8e10);
        assert!(early.secs_since(late) < -1.8e10);

        let t = Timestamp::from_secs_f64(12.5);
        assert_eq!(t.secs_since(Timestamp::from_secs_f64(10.0)), 2.5);
    }

    #[test]
    fn test_landmark_index_roundtrip() {
        for i in 0..LandmarkIndex::COUNT as u8 {
            let idx = LandmarkIndex::from_index(i).unwrap();
            assert_eq!(idx as u8, i);
        }
        assert_eq!(LandmarkIndex::from_index(33), None);
    }

    #[test]
    fn test_opposite_landmarks() {
        assert_eq!(LandmarkIndex::Nose.opposite(), LandmarkIndex::Nose);
        assert_eq!(LandmarkIndex::LeftEyeOuter.opposite(), LandmarkIndex::RightEyeOuter);
        assert_eq!(LandmarkIndex::RightEyeInner.opposite(), LandmarkIndex::LeftEyeInner);
        assert_eq!(LandmarkIndex::LeftEar.opposite(), LandmarkIndex::RightEar);
        assert_eq!(LandmarkIndex::MouthRight.opposite(), LandmarkIndex::MouthLeft);
        assert_eq!(LandmarkIndex::LeftShoulder.opposite(), LandmarkIndex::RightShoulder);
        assert_eq!(LandmarkIndex::RightHip.opposite(), LandmarkIndex::LeftHip);
        assert_eq!(LandmarkIndex::RightFootIndex.opposite(), LandmarkIndex::LeftFootIndex);
    }

    #[test]
    fn test_visibility_defaults_to_one() {
        let lm = Landmark::new(0.5, 0.5);
        assert_eq!(lm.visibility(), 1.0);
        assert!(lm.is_visible(0.1));
        assert!(!lm.with_visibility(0.05).is_visible(0.1));
    }

    #[test]
    fn test_frame_from_raw_filters_invalid_entries() {
        let raw: serde_json::Value = serde_json::json!({
            "0": {"x": 0.5, "y": 0.3},
            "11": {"x": 0.6, "y": 0.5, "visibility": 0.9},
            "40": {"x": 0.1, "y": 0.1},
            "nose": {"x": 0.1, "y": 0.1},
            "12": {"y": 0.5}
        });
        let frame = Frame::from_raw(raw.as_object().unwrap());

        assert_eq!(frame.len(), 2);
        assert!(frame.contains(LandmarkIndex::Nose));
        assert_eq!(
            frame.get(LandmarkIndex::LeftShoulder).unwrap().visibility,
            Some(0.9)
        );
        assert!(!frame.contains(LandmarkIndex::RightShoulder));
    }

    #[test]
    fn test_frame_mirrored() {
        let frame = Frame::new()
            .with(LandmarkIndex::LeftShoulder, Landmark::new(0.7, 0.5))
            .with(LandmarkIndex::RightShoulder, Landmark::new(0.3, 0.52));
        let mirrored = frame.mirrored();

        let left = mirrored.get(LandmarkIndex::LeftShoulder).unwrap();
        let right = mirrored.get(LandmarkIndex::RightShoulder).unwrap();
        assert!((left.x - 0.7).abs() < 1e-12);
        assert!((left.y - 0.52).abs() < 1e-12);
        assert!((right.x - 0.3).abs() < 1e-12);
        assert!((right.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_profile_validation() {
        let mut profile = CalibrationProfile {
            created_at: Utc::now(),
            ideal_ear_shoulder_angle: 160.0,
            ideal_shoulder_hip_angle: 170.0,
            baseline_shoulder_height: 0.5,
            baseline_head_distance: 0.02,
            baseline_body_size: 0.2,
            baseline_head_forward: -0.6,
            baseline_shoulder_tilt: 0.0,
        };
        assert!(profile.validate().is_ok());

        profile.baseline_body_size = 0.0;
        assert!(matches!(profile.validate(), Err(Error::InvalidProfile(_))));

        profile.baseline_body_size = 0.2;
        profile.ideal_ear_shoulder_angle = f64::NAN;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_profile_accepts_legacy_json() {
        let json = r#"{
            "created_at": "2024-05-01T10:00:00Z",
            "ideal_ear_shoulder_angle": 158.2,
            "ideal_shoulder_hip_angle": 171.0,
            "baseline_shoulder_height": 0.55,
            "baseline_head_distance": 0.01,
            "baseline_body_size": 0.25
        }"#;
        let profile: CalibrationProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.baseline_head_forward, 0.0);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_issue_serializes_with_type_tag() {
        let issue = PostureIssue {
            issue_type: PostureIssueType::UnevenShoulders,
            severity: Severity::Moderate,
            measurement: "2.0%".into(),
            advice: "Level your shoulders".into(),
        };
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["type"], "uneven_shoulders");
        assert_eq!(value["severity"], "moderate");
    }

    #[test]
    fn test_severity_grading() {
        assert_eq!(Severity::from_score(8.5), Severity::Mild);
        assert_eq!(Severity::from_score(7.0), Severity::Mild);
        assert_eq!(Severity::from_score(6.9), Severity::Moderate);
        assert_eq!(Severity::from_score(4.99), Severity::Severe);
        assert!(Severity::Severe.rank() < Severity::Mild.rank());
    }
}
