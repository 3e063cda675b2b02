//! Post-session report: the issues a user hit most and what to change.

use posture_core::PostureIssueType;
use serde::{Deserialize, Serialize};

use crate::record::PostureLogRecord;
use crate::session::SessionSummary;

/// Recommendations shown per report
pub const MAX_RECOMMENDATIONS: usize = 3;

/// Shown when no logged issue has a matching recommendation
pub const GOOD_POSTURE_MESSAGE: &str = "Great job! Keep up the good posture.";

/// Summary of a stored session plus advice derived from its logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub common_issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl SessionReport {
    pub fn new(summary: SessionSummary, logs: &[PostureLogRecord]) -> Self {
        let common_issues = identify_common_issues(logs);
        let recommendations = recommendations(&common_issues);
        Self {
            summary,
            common_issues,
            recommendations,
        }
    }
}

/// Issue types across `logs`, most frequent first; ties keep first-seen order
pub fn identify_common_issues(logs: &[PostureLogRecord]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for issue in logs.iter().flat_map(|log| &log.issues) {
        match counts.iter().position(|(t, _)| *t == issue.issue_type) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((issue.issue_type.as_str(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(t, _)| t.to_string()).collect()
}

/// Advice for the top issues, at most [`MAX_RECOMMENDATIONS`]
pub fn recommendations(common_issues: &[String]) -> Vec<String> {
    let advice: Vec<String> = common_issues
        .iter()
        .filter_map(|issue| recommendation_for(issue))
        .take(MAX_RECOMMENDATIONS)
        .map(str::to_string)
        .collect();

    if advice.is_empty() {
        vec![GOOD_POSTURE_MESSAGE.to_string()]
    } else {
        advice
    }
}

/// Workstation advice for a logged issue type; unknown types have none
pub fn recommendation_for(issue_type: &str) -> Option<&'static str> {
    Some(match PostureIssueType::from_name(issue_type)? {
        PostureIssueType::ForwardHead => {
            "Position your monitor at eye level to prevent looking down."
        }
        PostureIssueType::Slouching => "Use a chair with lumbar support or a lumbar roll.",
        PostureIssueType::UnevenShoulders => {
            "Check if your desk or chair height is uneven, and avoid leaning on one side."
        }
        PostureIssueType::NeckTilt => "Avoid cradling a phone between your shoulder and ear.",
        PostureIssueType::ScreenDistance => {
            "Increase font size or move your monitor closer so you don't lean in to read."
        }
    })
}
