//! Dead-zone + graduated-penalty scoring of posture metrics.
//!
//! Each of the five posture dimensions maps its deviation to a 1-10 score:
//!
//! ```text
//! 10 ┤━━╮
//!  8 ┤  ╰━━╮            mild:   10 → 8 over [0, mild]
//!    │     ╲
//!  4 ┤      ╰━╮         moderate: 8 → 4 over (mild, severe]
//!  1 ┤        ╰━━━━━━   beyond severe: 4 - 1.5·excess, floored at 1
//!    └──┬──┬───────
//!      mild severe
//! ```
//!
//! The frame score is the weighted average of the dimension scores.

use posture_core::{PostureIssue, PostureIssueType, PostureMetrics, Severity};
use serde::{Deserialize, Serialize};

/// Dimension scores below this produce a [`PostureIssue`]
pub const ISSUE_THRESHOLD: f64 = 9.0;

/// At most this many issues are reported per frame
pub const MAX_ISSUES_PER_FRAME: usize = 2;

/// Scoring curve for one posture dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionConfig {
    /// Deviation ignored as jitter
    pub dead_zone: f64,
    /// Deviation at which the score reaches 8
    pub mild: f64,
    /// Deviation at which the score reaches 4
    pub severe: f64,
}

impl DimensionConfig {
    pub const fn new(dead_zone: f64, mild: f64, severe: f64) -> Self {
        Self {
            dead_zone,
            mild,
            severe,
        }
    }
}

/// Magnitude in excess of the dead zone, or 0 inside it
pub fn apply_dead_zone(value: f64, dead_zone: f64) -> f64 {
    if value.abs() <= dead_zone {
        0.0
    } else {
        value.abs() - dead_zone
    }
}

/// Piecewise-linear mapping of a deviation onto [1, 10]
pub fn graduated_penalty(deviation: f64, mild: f64, severe: f64) -> f64 {
    if deviation <= 0.0 {
        return 10.0;
    }

    if deviation <= mild {
        10.0 - (deviation / mild) * 2.0
    } else if deviation <= severe {
        let progress = (deviation - mild) / (severe - mild);
        8.0 - progress * 4.0
    } else {
        let excess = deviation - severe;
        (4.0 - excess * 1.5).max(1.0)
    }
}

pub fn score_dimension(deviation: f64, config: &DimensionConfig) -> f64 {
    graduated_penalty(
        apply_dead_zone(deviation, config.dead_zone),
        config.mild,
        config.severe,
    )
}

/// The five scored posture dimensions, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    ShoulderAsymmetry,
    Slouch,
    NeckTilt,
    HeadDrop,
    ScreenDistance,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::ShoulderAsymmetry,
        Dimension::Slouch,
        Dimension::NeckTilt,
        Dimension::HeadDrop,
        Dimension::ScreenDistance,
    ];

    pub fn config(&self) -> DimensionConfig {
        match self {
            Dimension::ShoulderAsymmetry => DimensionConfig::new(0.008, 0.01, 0.03),
            Dimension::Slouch => DimensionConfig::new(0.0, 3.0, 8.0),
            Dimension::NeckTilt => DimensionConfig::new(0.005, 0.01, 0.03),
            Dimension::HeadDrop => DimensionConfig::new(0.01, 0.02, 0.05),
            Dimension::ScreenDistance => DimensionConfig::new(3.0, 3.0, 10.0),
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Dimension::Slouch => 0.35,
            Dimension::HeadDrop => 0.25,
            Dimension::ShoulderAsymmetry => 0.15,
            Dimension::NeckTilt => 0.15,
            Dimension::ScreenDistance => 0.10,
        }
    }

    /// The deviation this dimension scores, in its curve's units
    pub fn deviation(&self, metrics: &PostureMetrics) -> f64 {
        match self {
            Dimension::ShoulderAsymmetry => metrics.shoulder_asymmetry,
            Dimension::Slouch => metrics.slouch_angle,
            Dimension::NeckTilt => metrics.neck_tilt_angle / 100.0,
            Dimension::HeadDrop => metrics.forward_head_distance,
            Dimension::ScreenDistance => metrics.screen_distance_change,
        }
    }

    pub fn issue_type(&self) -> PostureIssueType {
        match self {
            Dimension::ShoulderAsymmetry => PostureIssueType::UnevenShoulders,
            Dimension::Slouch => PostureIssueType::Slouching,
            Dimension::NeckTilt => PostureIssueType::NeckTilt,
            Dimension::HeadDrop => PostureIssueType::ForwardHead,
            Dimension::ScreenDistance => PostureIssueType::ScreenDistance,
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Dimension::ShoulderAsymmetry => "Level your shoulders - one is higher than the other",
            Dimension::Slouch => "Sit up straight - you're slouching forward",
            Dimension::NeckTilt => "Keep your head level - it's tilting to one side",
            Dimension::HeadDrop => "Pull your head back - chin tuck position",
            Dimension::ScreenDistance => "Move back from your screen",
        }
    }

    pub fn measurement(&self, metrics: &PostureMetrics) -> String {
        match self {
            Dimension::ShoulderAsymmetry => format!("{:.1}%", metrics.shoulder_asymmetry * 100.0),
            Dimension::Slouch => format!("{:.1}°", metrics.slouch_angle),
            Dimension::NeckTilt => format!("{:.1}", metrics.neck_tilt_angle),
            Dimension::HeadDrop => format!("{:.1}%", metrics.forward_head_distance * 100.0),
            Dimension::ScreenDistance => format!("{:.1}%", metrics.screen_distance_change),
        }
    }

    fn severity(&self, score: f64) -> Severity {
        match (self, Severity::from_score(score)) {
            // Distance drift is never reported as severe
            (Dimension::ScreenDistance, Severity::Severe) => Severity::Moderate,
            (_, severity) => severity,
        }
    }

    fn issue(&self, score: f64, metrics: &PostureMetrics) -> Option<PostureIssue> {
        if score >= ISSUE_THRESHOLD {
            return None;
        }
        Some(PostureIssue {
            issue_type: self.issue_type(),
            severity: self.severity(score),
            measurement: self.measurement(metrics),
            advice: self.advice().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub score: f64,
    pub weight: f64,
}

/// Unsmoothed score for one frame with its per-dimension breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub raw_score: f64,
    pub dimensions: Vec<DimensionScore>,
    pub issues: Vec<PostureIssue>,
}

impl ScoreReport {
    /// Report used when there is no baseline to compare against
    pub fn perfect() -> Self {
        Self {
            raw_score: 10.0,
            dimensions: Dimension::ALL
                .iter()
                .map(|d| DimensionScore {
                    dimension: *d,
                    score: 10.0,
                    weight: d.weight(),
                })
                .collect(),
            issues: Vec::new(),
        }
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<f64> {
        self.dimensions
            .iter()
            .find(|d| d.dimension == dimension)
            .map(|d| d.score)
    }
}

/// Score all five dimensions and keep the most significant issues
pub fn score_metrics(metrics: &PostureMetrics) -> ScoreReport {
    let mut dimensions = Vec::with_capacity(Dimension::ALL.len());
    let mut issues = Vec::new();

    for dimension in Dimension::ALL {
        let score = score_dimension(dimension.deviation(metrics), &dimension.config());
        dimensions.push(DimensionScore {
            dimension,
            score,
            weight: dimension.weight(),
        });
        issues.extend(dimension.issue(score, metrics));
    }

    let total_weight: f64 = dimensions.iter().map(|d| d.weight).sum();
    let raw_score = if total_weight > 0.0 {
        dimensions.iter().map(|d| d.score * d.weight).sum::<f64>() / total_weight
    } else {
        10.0
    };

    // Stable: equal severities keep evaluation order
    issues.sort_by_key(|issue| issue.severity.rank());
    issues.truncate(MAX_ISSUES_PER_FRAME);

    ScoreReport {
        raw_score,
        dimensions,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_anchor_points() {
        assert_eq!(graduated_penalty(0.0, 3.0, 8.0), 10.0);
        assert!((graduated_penalty(3.0, 3.0, 8.0) - 8.0).abs() < 1e-12);
        assert!((graduated_penalty(1.5, 3.0, 8.0) - 9.0).abs() < 1e-12);
        assert!((graduated_penalty(8.0, 3.0, 8.0) - 4.0).abs() < 1e-12);
        assert!((graduated_penalty(9.0, 3.0, 8.0) - 2.5).abs() < 1e-12);
        assert_eq!(graduated_penalty(100.0, 3.0, 8.0), 1.0);
    }

    #[test]
    fn test_penalty_monotonic_and_floored() {
        for config in Dimension::ALL.map(|d| d.config()) {
            let mut previous = f64::INFINITY;
            for step in 0..2000 {
                let deviation = step as f64 * config.severe / 200.0;
                let score = graduated_penalty(deviation, config.mild, config.severe);
                assert!(score <= previous + 1e-12, "penalty increased at {deviation}");
                assert!((1.0..=10.0).contains(&score));
                previous = score;
            }
        }
    }

    #[test]
    fn test_dead_zone() {
        assert_eq!(apply_dead_zone(0.005, 0.008), 0.0);
        assert_eq!(apply_dead_zone(-0.008, 0.008), 0.0);
        assert!((apply_dead_zone(-0.02, 0.008) - 0.012).abs() < 1e-12);
        assert!((apply_dead_zone(5.0, 0.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_metrics_score_ten() {
        let report = score_metrics(&PostureMetrics::default());
        assert!((report.raw_score - 10.0).abs() < 1e-9);
        assert!(report.issues.is_empty());
        assert_eq!(report.dimensions.len(), 5);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_average_not_minimum() {
        let metrics = PostureMetrics {
            slouch_angle: 20.0,
            ..Default::default()
        };
        let report = score_metrics(&metrics);

        assert_eq!(report.dimension(Dimension::Slouch), Some(1.0));
        // 0.35 * 1 + 0.65 * 10
        assert!((report.raw_score - 6.85).abs() < 1e-9);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].issue_type, PostureIssueType::Slouching);
        assert_eq!(report.issues[0].severity, Severity::Severe);
        assert_eq!(report.issues[0].measurement, "20.0°");
    }

    #[test]
    fn test_issues_ranked_and_truncated() {
        let metrics = PostureMetrics {
            // 0.02 - 0.008 = 0.012 → 7.6, mild
            shoulder_asymmetry: 0.02,
            // severe
            slouch_angle: 10.0,
            // 0.012 - 0.005 = 0.007 → 8.6, mild
            neck_tilt_angle: 1.2,
            // 0.045 - 0.01 = 0.035 → 6.0, moderate
            forward_head_distance: 0.045,
            screen_distance_change: 0.0,
        };
        let report = score_metrics(&metrics);

        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].severity, Severity::Severe);
        assert_eq!(report.issues[0].issue_type, PostureIssueType::Slouching);
        assert_eq!(report.issues[1].severity, Severity::Moderate);
        assert_eq!(report.issues[1].issue_type, PostureIssueType::ForwardHead);
    }

    #[test]
    fn test_screen_distance_capped_at_moderate() {
        let metrics = PostureMetrics {
            screen_distance_change: 40.0,
            ..Default::default()
        };
        let report = score_metrics(&metrics);
        assert_eq!(report.dimension(Dimension::ScreenDistance), Some(1.0));
        assert_eq!(report.issues[0].severity, Severity::Moderate);
    }

    #[test]
    fn test_negative_head_drop_scored_by_magnitude() {
        let metrics = PostureMetrics {
            forward_head_distance: -0.015,
            ..Default::default()
        };
        let score = score_dimension(
            Dimension::HeadDrop.deviation(&metrics),
            &Dimension::HeadDrop.config(),
        );
        assert!((score - 9.5).abs() < 1e-9);
    }
}
